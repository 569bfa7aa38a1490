/*!
Interoperation between the client (user) and server.

(Not the application and the tables on disk; that's covered by `store`.)

A user logs in by POSTing a form to `/login`; the role of the matching user
decides which page gets served back. That page carries the user's session
key, which must accompany every later request to `/admin`, `/teacher`,
`/student`, or `/logout` in the `x-schoolrec-uname` and `x-schoolrec-key`
headers. Those later requests say what they want done with an
`x-schoolrec-action` header.
*/
use std::{
    fmt::Debug,
    path::Path,
    sync::Arc,
};

use axum::{
    extract::{Extension, Form},
    http::{header::{HeaderMap, HeaderName, HeaderValue}, Request, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, get_service, post},
    Json, Router,
};
use handlebars::Handlebars;
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;

use crate::auth::AuthResult;
use crate::config::Glob;
use crate::user::{Role, User};

pub mod admin;
pub mod student;
pub mod teacher;

pub static UNAME_HEADER: &str = "x-schoolrec-uname";
pub static KEY_HEADER: &str = "x-schoolrec-key";
pub static ACTION_HEADER: &str = "x-schoolrec-action";

pub static BAD_LOGIN: &str = "Wrong username or password";

static TEMPLATES: OnceCell<Handlebars> = OnceCell::new();

static HTML_500: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>schoolrec | Error</title>
<link rel="stylesheet" href="/static/schoolrec.css">
</head>
<body>
<h1>Internal Server Error</h1>
<p>(Error 500)</p>
<p>Something went wrong on our end. No further or more
helpful information is available about the problem.</p>
</body>
</html>"#;

static TEXT_500: &str = "An internal error occurred; an appropriate response was inconstructable.";

trait AddHeaders: IntoResponse + Sized {
    fn add_headers(self, mut new_headers: Vec<(HeaderName, HeaderValue)>) -> Response {
        let mut r = self.into_response();
        let r_headers = r.headers_mut();
        for (name, value) in new_headers.drain(..) {
            r_headers.insert(name, value);
        }

        r
    }
}

impl<T: IntoResponse + Sized> AddHeaders for T {}

/// Data type to read the form data from a front-page login request.
#[derive(serde::Deserialize, Debug)]
pub struct LoginData {
    pub uname: String,
    pub password: String,
}

/**
Initializes the resources used in this module. This function should be called
before any functionality of this module or any of its submodules is used.

Currently the only thing that happens here is loading the templates used by
`serve_template()`, which will respond with a 500 for everything until
`init()` has been called.
*/
pub fn init<P: AsRef<Path>>(template_dir: P) -> Result<(), String> {
    if TEMPLATES.get().is_some() {
        log::warn!("Templates directory already initialized; ignoring.");
        return Ok(())
    }

    let template_dir = template_dir.as_ref();

    let mut h = Handlebars::new();
    #[cfg(debug_assertions)]
    h.set_dev_mode(true);
    h.register_templates_directory(".html", template_dir)
        .map_err(|e| format!(
            "Error registering templates directory {}: {}",
            template_dir.display(), &e
        ))?;

    TEMPLATES.set(h)
        .map_err(|old_h| {
            let mut estr = String::from("Templates directory already registered w/templates:");
            for template_name in old_h.get_templates().keys() {
                estr.push('\n');
                estr.push_str(template_name.as_str());
            }
            estr
        })?;

    Ok(())
}

/**
Return an HTML response in the case of an unrecoverable* error.

(*"Unrecoverable" from the perspective of fielding the current request,
not from the perspective of the program crashing.)
*/
pub fn html_500() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(HTML_500)
    ).into_response()
}

pub fn text_500(text: Option<String>) -> Response {
    match text {
        Some(text) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            text
        ).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            TEXT_500.to_owned()
        ).into_response()
    }
}

pub fn serve_template<S>(
    code: StatusCode,
    template_name: &str,
    data: &S,
    addl_headers: Vec<(HeaderName, HeaderValue)>
) -> Response
where
    S: Serialize + Debug
{
    log::trace!("serve_template( {}, {:?}, ... ) called.", &code, template_name);

    let templates = match TEMPLATES.get() {
        Some(t) => t,
        None => {
            log::error!("serve_template() called before inter::init().");
            return html_500();
        },
    };

    match templates.render(template_name, data) {
        Ok(response_body) => (
            code,
            Html(response_body)
        ).add_headers(addl_headers),
        Err(e) => {
            log::error!(
                "Error rendering template {:?} with data {:?}:\n{}",
                template_name, data, &e
            );
            html_500()
        },
    }
}

/// JSON response to an API request, echoing the action it answers.
pub fn respond_json<S: Serialize>(action: &'static str, data: S) -> Response {
    (
        StatusCode::OK,
        [(
            HeaderName::from_static(ACTION_HEADER),
            HeaderValue::from_static(action)
        )],
        Json(data),
    ).into_response()
}

pub fn respond_bad_password() -> Response {
    log::trace!("respond_bad_password() called.");

    let data = json!({
        "error_message": BAD_LOGIN
    });

    serve_template(
        StatusCode::UNAUTHORIZED,
        "login",
        &data,
        vec![]
    )
}

pub fn respond_bad_key() -> Response {
    log::trace!("respond_bad_key() called.");

    (
        StatusCode::UNAUTHORIZED,
        "Invalid authorization key.".to_owned(),
    ).into_response()
}

pub fn respond_bad_request(msg: String) -> Response {
    log::trace!("respond_bad_request( {:?} ) called.", &msg);

    (
        StatusCode::BAD_REQUEST,
        msg
    ).into_response()
}

pub fn respond_forbidden(u: &User, role: Role) -> Response {
    log::warn!(
        "{:?} ({}) attempted to use the {} interface.", &u.uname, &u.role, &role
    );

    (
        StatusCode::FORBIDDEN,
        format!("The {} interface is not available to you.", &role),
    ).into_response()
}

/// Get the value of header `name` as a `&str`, or an appropriate response
/// if it's missing or garbled.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, Response> {
    match headers.get(name) {
        Some(val) => match std::str::from_utf8(val.as_bytes()) {
            Ok(s) => Ok(s),
            Err(e) => {
                log::error!(
                    "Failed converting {} value {:?} to &str: {}",
                    name, val, &e
                );
                Err(respond_bad_request(format!("{} value unrecognizable.", name)))
            },
        },
        None => Err(respond_bad_request(
            format!("Request must have an {} header.", name)
        )),
    }
}

/**
Get the value of a header that carries a username.

Browsers won't put arbitrary Unicode in a header, so the page
percent-encodes usernames; raw UTF-8 is accepted too.
*/
pub fn header_name_value(headers: &HeaderMap, name: &str) -> Result<String, Response> {
    let raw = header_str(headers, name)?;
    match urlencoding::decode(raw) {
        Ok(s) => Ok(s.into_owned()),
        Err(e) => {
            log::error!(
                "Failed percent-decoding {} value {:?}: {}",
                name, raw, &e
            );
            Err(respond_bad_request(format!("{} value unrecognizable.", name)))
        },
    }
}

/// Refuse to continue unless `u` has `role`.
pub fn require_role(u: &User, role: Role) -> Result<(), Response> {
    if u.role == role {
        Ok(())
    } else {
        Err(respond_forbidden(u, role))
    }
}

/**
Middleware function to ensure the request carries a valid session key.

On success, the session's `User` is inserted into the request's extensions
for the handlers further down.
*/
pub async fn key_authenticate<B>(
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    let glob: Arc<RwLock<Glob>> = match req.extensions().get::<Arc<RwLock<Glob>>>() {
        Some(glob) => glob.clone(),
        None => {
            log::error!("key_authenticate() found no global state extension.");
            return text_500(None);
        },
    };

    let uname = match header_name_value(req.headers(), UNAME_HEADER) {
        Ok(s) => s,
        Err(resp) => { return resp; },
    };
    let key = match header_str(req.headers(), KEY_HEADER) {
        Ok(s) => s.to_owned(),
        Err(resp) => { return resp; },
    };

    // Bind the result so the read lock is released before going on.
    let res = glob.read().await.check_key(&uname, &key);

    match res {
        AuthResult::Ok(u) => {
            req.extensions_mut().insert(u);
        },
        AuthResult::InvalidKey => {
            return respond_bad_key();
        },
        x => {
            log::warn!(
                "Glob::check_key( {:?}, ... ) returned {:?}, which should never happen.",
                &uname, &x
            );
            return text_500(None);
        },
    }

    next.run(req).await
}

pub async fn login_page() -> Response {
    serve_template(StatusCode::OK, "login", &json!({}), vec![])
}

/// Check the login form and serve the page for the user's role.
pub async fn login(
    Extension(glob): Extension<Arc<RwLock<Glob>>>,
    Form(form): Form<LoginData>,
) -> Response {
    log::trace!("login( {:?}, ... ) called.", &form.uname);

    let res = glob.write().await.check_password_and_issue_key(
        &form.uname, &form.password
    );

    let (key, u) = match res {
        AuthResult::Key(key, u) => (key, u),
        AuthResult::BadPassword => { return respond_bad_password(); },
        x => {
            log::warn!(
                "Glob::check_password_and_issue_key( {:?}, ... ) returned {:?}, which shouldn't happen.",
                &form.uname, &x
            );
            return respond_bad_password();
        },
    };

    match u.role {
        Role::Admin => admin::login(u, key, glob).await,
        Role::Teacher => teacher::login(u, key, glob).await,
        Role::Student => student::login(u, key, glob).await,
    }
}

/// End the session and go back to the login page.
pub async fn logout(
    headers: HeaderMap,
    Extension(u): Extension<User>,
    Extension(glob): Extension<Arc<RwLock<Glob>>>,
) -> Response {
    log::trace!("logout( {:?} ) called.", &u.uname);

    let key = match header_str(&headers, KEY_HEADER) {
        Ok(s) => s,
        Err(resp) => { return resp; },
    };

    if !glob.write().await.logout(&u.uname, key) {
        log::warn!("Logout of {:?} found no session to end.", &u.uname);
    }

    let data = json!({
        "message": "You have been logged out."
    });
    serve_template(StatusCode::OK, "login", &data, vec![])
}

async fn catchall_error_handler(e: std::io::Error) -> impl IntoResponse {
    log::error!("Error serving static file: {}", &e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Unhandled internal error: {}", &e)
    )
}

/// The whole application: login, the three role APIs, logout, and static
/// assets from `static_dir`.
pub fn router<P: AsRef<Path>>(glob: Arc<RwLock<Glob>>, static_dir: P) -> Router {
    let serve_static = get_service(ServeDir::new(static_dir.as_ref()))
        .handle_error(catchall_error_handler);

    let keyed = Router::new()
        .route("/admin", post(admin::api))
        .route("/teacher", post(teacher::api))
        .route("/student", post(student::api))
        .route("/logout", post(logout))
        .layer(middleware::from_fn(key_authenticate));

    Router::new()
        .route("/", get(login_page))
        .route("/login", post(login))
        .merge(keyed)
        .nest("/static", serve_static)
        .layer(Extension(glob))
}
