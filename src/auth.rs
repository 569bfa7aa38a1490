/*!
Session keys.

Passwords are checked against the user table (see `store::users`); a
successful login is issued a random key, and later requests present the
username and key to prove who they are. Each key identifies exactly one
user until it is revoked at logout, or until that user logs in again.
*/
use std::collections::HashMap;

use rand::{distributions, Rng};

use crate::user::User;

const DEFAULT_KEY_LENGTH: usize = 32;
const DEFAULT_KEY_CHARS: &str =
"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, PartialEq)]
pub enum AuthResult {
    /// Valid key; the session's user.
    Ok(User),
    /// Good password; the newly-issued key and the user it belongs to.
    Key(String, User),
    BadPassword,
    InvalidKey,
}

#[derive(Debug)]
pub struct Sessions {
    key_chars: Vec<char>,
    key_length: usize,
    /// key -> the user that logged in with it
    keys: HashMap<String, User>,
}

impl Default for Sessions {
    fn default() -> Self { Self::new() }
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            key_chars: DEFAULT_KEY_CHARS.chars().collect(),
            key_length: DEFAULT_KEY_LENGTH,
            keys: HashMap::new(),
        }
    }

    /// Set the length of keys to generate.
    ///
    /// Will quietly do nothing if set to zero.
    pub fn set_key_length(&mut self, new_length: usize) {
        if new_length > 0 {
            self.key_length = new_length;
        }
    }

    fn generate_key(&self) -> String {
        let rng = rand::thread_rng();
        // `key_chars` is never empty, so this never falls back.
        match distributions::Slice::new(&self.key_chars) {
            Ok(dist) => rng.sample_iter(&dist).take(self.key_length).collect(),
            Err(_) => String::new(),
        }
    }

    /// Start a session for `u`, returning its key. Any earlier key of
    /// `u`'s is revoked.
    pub fn issue(&mut self, u: User) -> String {
        log::trace!("Sessions::issue( {:?} ) called.", &u.uname);

        let n_before = self.keys.len();
        self.keys.retain(|_, v| v.uname != u.uname);
        if self.keys.len() < n_before {
            log::debug!("Replaced existing session for {:?}.", &u.uname);
        }

        let mut key = self.generate_key();
        while self.keys.contains_key(&key) {
            key = self.generate_key();
        }
        self.keys.insert(key.clone(), u);
        key
    }

    /// Check that `key` was issued to `uname` and hasn't been revoked.
    pub fn check(&self, uname: &str, key: &str) -> AuthResult {
        log::trace!("Sessions::check( {:?}, ... ) called.", uname);

        match self.keys.get(key) {
            Some(u) if u.uname == uname => AuthResult::Ok(u.clone()),
            _ => AuthResult::InvalidKey,
        }
    }

    /// End the session with `key`. Returns whether there was one to end.
    pub fn revoke(&mut self, uname: &str, key: &str) -> bool {
        log::trace!("Sessions::revoke( {:?}, ... ) called.", uname);

        match self.keys.get(key) {
            Some(u) if u.uname == uname => {
                self.keys.remove(key);
                true
            },
            _ => false,
        }
    }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }
}
