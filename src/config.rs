/*!
Structs to hold configuration data and global variables.
*/
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    auth::{AuthResult, Sessions},
    store::Store,
    user::{Role, User},
};

#[derive(Deserialize)]
struct ConfigFile {
    users_file: Option<String>,
    marks_file: Option<String>,
    templates_dir: Option<String>,
    static_dir: Option<String>,
    admin_uname: Option<String>,
    admin_password: Option<String>,
    key_length: Option<usize>,
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug)]
pub struct Cfg {
    pub users_file: PathBuf,
    pub marks_file: PathBuf,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    /// If set (along with the password), this admin is created at startup
    /// when the user table holds no admin.
    pub default_admin_uname: Option<String>,
    pub default_admin_password: Option<String>,
    pub key_length: usize,
    pub addr: SocketAddr,
}

impl std::default::Default for Cfg {
    fn default() -> Self {
        Self {
            users_file: PathBuf::from("users.csv"),
            marks_file: PathBuf::from("marks.csv"),
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            default_admin_uname: None,
            default_admin_password: None,
            key_length: 32,
            addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
                8001
            ),
        }
    }
}

impl Cfg {
    pub fn from_toml(text: &str) -> Result<Self, String> {
        let cf: ConfigFile = toml::from_str(text)
            .map_err(|e| format!("Unable to deserialize config file: {}", &e))?;

        let mut c = Self::default();

        if let Some(s) = cf.users_file {
            c.users_file = PathBuf::from(s);
        }
        if let Some(s) = cf.marks_file {
            c.marks_file = PathBuf::from(s);
        }
        if let Some(s) = cf.templates_dir {
            c.templates_dir = PathBuf::from(s);
        }
        if let Some(s) = cf.static_dir {
            c.static_dir = PathBuf::from(s);
        }
        if let Some(s) = cf.admin_uname {
            c.default_admin_uname = Some(s);
        }
        if let Some(s) = cf.admin_password {
            c.default_admin_password = Some(s);
        }
        if let Some(n) = cf.key_length {
            c.key_length = n;
        }
        if let Some(s) = cf.host {
            c.addr.set_ip(
                s.parse().map_err(|e| format!(
                    "Error parsing {:?} as IP address: {}",
                    &s, &e
                ))?
            );
        }
        if let Some(n) = cf.port {
            c.addr.set_port(n);
        }

        Ok(c)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file: {}", &e))?;
        Self::from_toml(&file_contents)
    }
}

/**
This guy will haul around the global state and be passed in an
`axum::Extension` to the handlers who need him.

He holds no copy of either table; those are reread from
disk through `store` every time they're wanted.
*/
#[derive(Debug)]
pub struct Glob {
    pub store: Store,
    pub sessions: Sessions,
    pub addr: SocketAddr,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Glob {
    pub fn new(cfg: Cfg) -> Self {
        let mut sessions = Sessions::new();
        sessions.set_key_length(cfg.key_length);

        Self {
            store: Store::new(cfg.users_file, cfg.marks_file),
            sessions,
            addr: cfg.addr,
            templates_dir: cfg.templates_dir,
            static_dir: cfg.static_dir,
        }
    }

    /// Check `uname` and `password` against the user table, and issue a
    /// session key if they match.
    pub fn check_password_and_issue_key(
        &mut self,
        uname: &str,
        password: &str,
    ) -> AuthResult {
        log::trace!(
            "Glob::check_password_and_issue_key( {:?}, ... ) called.", uname
        );

        match self.store.users().authenticate(uname, password) {
            Some(u) => {
                let key = self.sessions.issue(u.clone());
                log::info!("{:?} ({}) logged in.", &u.uname, &u.role);
                AuthResult::Key(key, u)
            },
            None => AuthResult::BadPassword,
        }
    }

    pub fn check_key(&self, uname: &str, key: &str) -> AuthResult {
        self.sessions.check(uname, key)
    }

    pub fn logout(&mut self, uname: &str, key: &str) -> bool {
        let ended = self.sessions.revoke(uname, key);
        if ended {
            log::info!("{:?} logged out.", uname);
        }
        ended
    }
}

/// Ensure the default admin, if one is configured, exists.
fn ensure_default_admin(cfg: &Cfg, store: &Store) -> Result<(), String> {
    let (uname, password) = match (
        &cfg.default_admin_uname, &cfg.default_admin_password
    ) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            log::trace!("No default Admin configured.");
            return Ok(());
        },
    };

    if store.users().has_admin() {
        log::trace!("User table already has an Admin.");
        return Ok(());
    }

    log::info!(
        "No Admin in user table; inserting default Admin ({}).", uname
    );
    let u = User {
        uname: uname.clone(),
        password: password.clone(),
        role: Role::Admin,
    };
    store.users().insert_user(&u)
        .map_err(|e| format!("Error inserting default Admin: {}", &e))
}

/// Builds the global state from `cfg`, ensuring both tables exist and
/// the default admin (if any) is present.
pub fn load_configuration(cfg: Cfg) -> Result<Glob, String> {
    log::info!("Configuration:\n{:#?}", &cfg);

    let store = Store::new(cfg.users_file.clone(), cfg.marks_file.clone());

    log::trace!("Checking state of table files...");
    store.ensure_files()
        .map_err(|e| format!("Unable to ensure table files: {}", &e))?;
    log::trace!("...table files okay.");

    ensure_default_admin(&cfg, &store)?;

    Ok(Glob::new(cfg))
}
