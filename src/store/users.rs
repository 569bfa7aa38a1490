/*!
The user table.

```csv
username,password,role
root,toot,admin
```
*/
use std::path::{Path, PathBuf};

use super::{ensure_table, read_table, write_table, StoreError};
use crate::user::{Role, User};

static HEADER: &[&str] = &["username", "password", "role"];

pub static EMPTY_FIELDS: &str = "Fields cannot be empty";
pub static UNAME_TAKEN: &str = "Username already exists";

/// Why a new user was refused.
#[derive(Debug, PartialEq)]
pub enum InsertError {
    /// Message to show the person who tried to create the user.
    Rejected(&'static str),
    Store(StoreError),
}

impl std::fmt::Display for InsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InsertError::Rejected(msg) => write!(f, "{}", msg),
            InsertError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl From<StoreError> for InsertError {
    fn from(e: StoreError) -> InsertError { InsertError::Store(e) }
}

/// Check a prospective `new` user against the `existing` ones.
pub fn check_new_user(existing: &[User], new: &User) -> Result<(), &'static str> {
    if new.uname.trim().is_empty() || new.password.trim().is_empty() {
        return Err(EMPTY_FIELDS);
    }
    if existing.iter().any(|u| u.uname == new.uname) {
        return Err(UNAME_TAKEN);
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct UserStore {
    path: PathBuf,
}

impl UserStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn ensure_file(&self) -> Result<(), StoreError> {
        ensure_table(&self.path, HEADER)
    }

    fn read(&self) -> Result<Vec<User>, StoreError> {
        read_table(&self.path, HEADER, User::from_csv_line)
    }

    /**
    Every user, in file order.

    This never fails; a table that can't be read is logged and treated
    as empty.
    */
    pub fn load(&self) -> Vec<User> {
        log::trace!("UserStore::load() called.");

        match self.read() {
            Ok(users) => users,
            Err(e) => {
                log::error!(
                    "Unable to read user table {}: {}",
                    self.path.display(), &e
                );
                Vec::new()
            },
        }
    }

    /// Return the first user whose username and password both match exactly.
    pub fn authenticate(&self, uname: &str, password: &str) -> Option<User> {
        log::trace!("UserStore::authenticate( {:?}, ... ) called.", uname);

        self.load().into_iter()
            .find(|u| u.uname == uname && u.password == password)
    }

    pub fn get_user_by_uname(&self, uname: &str) -> Option<User> {
        self.load().into_iter().find(|u| u.uname == uname)
    }

    /// Usernames of every student, in file order.
    pub fn students(&self) -> Vec<String> {
        self.load().into_iter()
            .filter(|u| u.role == Role::Student)
            .map(|u| u.uname)
            .collect()
    }

    /**
    Append `u` to the table and rewrite it.

    Refuses blank usernames or passwords and usernames already in use; in
    either case the file is not touched. Unlike `load()`, a table that can't
    be read is an error here, so a bad read never gets written back over
    the original.
    */
    pub fn insert_user(&self, u: &User) -> Result<(), InsertError> {
        log::trace!(
            "UserStore::insert_user( {:?}, {} ) called.", &u.uname, &u.role
        );

        let mut users = self.read()
            .map_err(|e| e.annotate("Unable to read user table"))?;

        check_new_user(&users, u).map_err(InsertError::Rejected)?;

        users.push(u.clone());
        write_table(&self.path, HEADER, users.iter().map(User::to_csv_line))
            .map_err(|e| e.annotate("Unable to write user table"))?;

        log::info!("Inserted user {:?} ({}).", &u.uname, &u.role);
        Ok(())
    }

    /// True if any admin exists.
    pub fn has_admin(&self) -> bool {
        self.load().iter().any(|u| u.role == Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{scratch_copy, scratch_path};
    use crate::tests::ensure_logging;

    use std::fs;

    fn new_user(uname: &str, password: &str, role: Role) -> User {
        User {
            uname: uname.to_owned(),
            password: password.to_owned(),
            role,
        }
    }

    #[test]
    fn load_users() {
        ensure_logging();
        let db = UserStore::new(scratch_copy("users_0.csv"));
        let users = db.load();
        log::trace!("Users:\n{:#?}", &users);
        assert_eq!(users.len(), 5);
        assert_eq!(users[0], new_user("root", "toot", Role::Admin));
        assert_eq!(db.students(), vec!["jsmith".to_owned(), "lwong".to_owned()]);
        fs::remove_file(db.path()).unwrap();
    }

    #[test]
    fn every_stored_pair_logs_in() {
        ensure_logging();
        let db = UserStore::new(scratch_copy("users_0.csv"));
        for u in db.load().iter() {
            assert_eq!(db.authenticate(&u.uname, &u.password).as_ref(), Some(u));
            let wrong = format!("{}x", &u.password);
            assert_eq!(db.authenticate(&u.uname, &wrong), None);
            assert_eq!(db.authenticate(&u.uname, ""), None);
        }
        assert_eq!(db.authenticate("nobody", "toot"), None);
        fs::remove_file(db.path()).unwrap();
    }

    #[test]
    fn password_comparison_is_exact() {
        ensure_logging();
        let db = UserStore::new(scratch_copy("users_0.csv"));
        assert!(db.authenticate("jsmith", "apple").is_some());
        assert!(db.authenticate("jsmith", "Apple").is_none());
        assert!(db.authenticate("jsmith", " apple").is_none());
        assert!(db.authenticate("JSmith", "apple").is_none());
        fs::remove_file(db.path()).unwrap();
    }

    #[test]
    fn insert_and_reject() {
        ensure_logging();
        let db = UserStore::new(scratch_copy("users_0.csv"));
        let before = fs::read_to_string(db.path()).unwrap();

        assert_eq!(
            db.insert_user(&new_user("jsmith", "other", Role::Teacher)),
            Err(InsertError::Rejected(UNAME_TAKEN))
        );
        assert_eq!(
            db.insert_user(&new_user("  ", "pw", Role::Student)),
            Err(InsertError::Rejected(EMPTY_FIELDS))
        );
        assert_eq!(
            db.insert_user(&new_user("nora", " ", Role::Student)),
            Err(InsertError::Rejected(EMPTY_FIELDS))
        );
        assert_eq!(fs::read_to_string(db.path()).unwrap(), before);

        db.insert_user(&new_user("nora", "pear", Role::Student)).unwrap();
        let users = db.load();
        assert_eq!(users.len(), 6);
        assert_eq!(users[5], new_user("nora", "pear", Role::Student));
        assert!(db.authenticate("nora", "pear").is_some());
        fs::remove_file(db.path()).unwrap();
    }

    #[test]
    fn insert_into_missing_table() {
        ensure_logging();
        let db = UserStore::new(scratch_path("no_users.csv"));
        assert!(db.load().is_empty());
        assert!(!db.has_admin());
        db.insert_user(&new_user("root", "toot", Role::Admin)).unwrap();
        assert!(db.has_admin());
        assert_eq!(
            fs::read_to_string(db.path()).unwrap(),
            "username,password,role\nroot,toot,admin\n"
        );
        fs::remove_file(db.path()).unwrap();
    }

    #[test]
    fn unknown_roles_are_skipped() {
        ensure_logging();
        let p = scratch_path("odd_roles.csv");
        fs::write(&p, "username,password,role\na,b,admin\nc,d,janitor\ne,f,student\n").unwrap();
        let db = UserStore::new(p);
        let unames: Vec<String> = db.load().into_iter().map(|u| u.uname).collect();
        assert_eq!(unames, vec!["a".to_owned(), "e".to_owned()]);
        fs::remove_file(db.path()).unwrap();
    }
}
