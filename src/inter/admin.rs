/*!
Subcrate for interoperation with Admin users.
*/
use crate::store::users::InsertError;
use super::*;

pub async fn login(
    u: User,
    key: String,
    glob: Arc<RwLock<Glob>>
) -> Response {
    log::trace!("admin::login( {:?}, ... ) called.", &u.uname);

    let users = glob.read().await.store.users().load();

    let data = json!({
        "uname": &u.uname,
        "key": &key,
        "users": &users,
    });

    serve_template(
        StatusCode::OK,
        "admin",
        &data,
        vec![]
    )
}

pub async fn api(
    headers: HeaderMap,
    Extension(u): Extension<User>,
    Extension(glob): Extension<Arc<RwLock<Glob>>>,
    body: Option<String>,
) -> Response {
    if let Err(resp) = require_role(&u, Role::Admin) {
        return resp;
    }

    let action = match header_str(&headers, ACTION_HEADER) {
        Ok(s) => s,
        Err(resp) => { return resp; },
    };

    match action {
        "populate-users" => populate_users(glob.clone()).await,
        "add-user" => add_user(body, glob.clone()).await,
        x => respond_bad_request(
            format!("{:?} is not a recognizable {} value.", x, ACTION_HEADER)
        ),
    }
}

async fn populate_users(glob: Arc<RwLock<Glob>>) -> Response {
    log::trace!("populate_users( Glob ) called.");

    let users = glob.read().await.store.users().load();
    respond_json("populate-users", users)
}

async fn add_user(body: Option<String>, glob: Arc<RwLock<Glob>>) -> Response {
    let body = match body {
        Some(body) => body,
        None => { return respond_bad_request(
            "Request requires a JSON body.".to_owned()
        ); },
    };

    let new_u: User = match serde_json::from_str(&body) {
        Ok(u) => u,
        Err(e) => {
            log::error!(
                "Error deserializing JSON {:?} as User: {}",
                &body, &e
            );
            return respond_bad_request("Unable to deserialize User struct.".to_owned());
        },
    };

    {
        let glob = glob.write().await;
        match glob.store.users().insert_user(&new_u) {
            Ok(()) => {},
            Err(InsertError::Rejected(msg)) => {
                return respond_bad_request(msg.to_owned());
            },
            Err(InsertError::Store(e)) => {
                log::error!(
                    "Error inserting new user {:?}: {}", &new_u.uname, &e
                );
                return text_500(Some(
                    format!("Unable to insert user: {}", &e)
                ));
            },
        }
    }

    populate_users(glob).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use super::super::tests::{api_headers, body_text, cleanup, session, test_glob};

    async fn call(
        glob: &Arc<RwLock<Glob>>,
        u: &User,
        key: &str,
        action: &str,
        body: Option<&str>,
    ) -> Response {
        api(
            api_headers(u, key, action),
            Extension(u.clone()),
            Extension(glob.clone()),
            body.map(|s| s.to_owned()),
        ).await
    }

    #[tokio::test]
    #[serial]
    async fn add_user_and_reject_duplicates() {
        let glob = test_glob();
        let (root, key) = session(&glob, "root", "toot").await;
        let users_path = glob.read().await.store.users().path().to_owned();

        let resp = call(&glob, &root, &key, "add-user",
            Some(r#"{"uname": "nora", "password": "pear", "role": "student"}"#)
        ).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(glob.read().await.store.users().authenticate("nora", "pear").is_some());

        let before = std::fs::read_to_string(&users_path).unwrap();
        let resp = call(&glob, &root, &key, "add-user",
            Some(r#"{"uname": "nora", "password": "plum", "role": "teacher"}"#)
        ).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "Username already exists");
        let resp = call(&glob, &root, &key, "add-user",
            Some(r#"{"uname": "", "password": "plum", "role": "teacher"}"#)
        ).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "Fields cannot be empty");
        let resp = call(&glob, &root, &key, "add-user",
            Some(r#"{"uname": "zed", "password": "  ", "role": "teacher"}"#)
        ).await;
        assert_eq!(body_text(resp).await, "Fields cannot be empty");
        let resp = call(&glob, &root, &key, "add-user",
            Some(r#"{"uname": "zed", "password": "plum", "role": "boss"}"#)
        ).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_to_string(&users_path).unwrap(), before);

        cleanup(glob).await;
    }

    #[tokio::test]
    #[serial]
    async fn only_admins_allowed() {
        let glob = test_glob();
        let (t, key) = session(&glob, "amira", "chalk").await;

        let resp = call(&glob, &t, &key, "populate-users", None).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let (root, key) = session(&glob, "root", "toot").await;
        let resp = call(&glob, &root, &key, "populate-users", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = call(&glob, &root, &key, "delete-user", Some("jsmith")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = call(&glob, &root, &key, "add-user", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        cleanup(glob).await;
    }
}
