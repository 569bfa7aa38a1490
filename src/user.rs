/*!
Users and their roles.
*/
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let token = match self {
            Role::Admin   => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        };

        write!(f, "{}", token)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin"   => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            _ => Err(format!("{:?} is not a valid Role.", s)),
        }
    }
}

/**
One row of the user table.

The password is stored and compared as plain text.
*/
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct User {
    pub uname: String,
    pub password: String,
    pub role: Role,
}

impl User {
    /**
    User .csv rows should look like this

    ```csv
    username,password,role
    jsmith,hunter2,student
    ```
    */
    pub fn from_csv_line(
        row: &csv::StringRecord
    ) -> Result<User, String> {
        log::trace!("User::from_csv_line( {:?} ) called.", row);

        let uname = match row.get(0) {
            Some(s) => s.to_owned(),
            None => { return Err("no username".to_owned()); },
        };
        let password = match row.get(1) {
            Some(s) => s.to_owned(),
            None => { return Err("no password".to_owned()); },
        };
        let role: Role = match row.get(2) {
            Some(s) => s.trim().parse()?,
            None => { return Err("no role".to_owned()); },
        };

        Ok(User { uname, password, role })
    }

    pub fn to_csv_line(&self) -> [String; 3] {
        [
            self.uname.clone(),
            self.password.clone(),
            self.role.to_string(),
        ]
    }
}
