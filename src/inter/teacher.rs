/*!
Subcrate for interoperation with Teacher users.
*/
use serde::Deserialize;

use crate::store::marks::{MarkRecord, SaveError, SubjectMark};
use super::*;

static NO_MARKS_YET: &str = "No marks yet. Add new subjects below.";

pub static STUDENT_HEADER: &str = "x-schoolrec-student";

pub async fn login(
    u: User,
    key: String,
    glob: Arc<RwLock<Glob>>
) -> Response {
    log::trace!("teacher::login( {:?}, ... ) called.", &u.uname);

    let (students, marks) = {
        let glob = glob.read().await;
        (glob.store.users().students(), glob.store.marks().load())
    };

    let data = json!({
        "uname": &u.uname,
        "key": &key,
        "students": &students,
        "marks": &marks,
    });

    serve_template(
        StatusCode::OK,
        "teacher",
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
    if let Err(resp) = require_role(&u, Role::Teacher) {
        return resp;
    }

    let action = match header_str(&headers, ACTION_HEADER) {
        Ok(s) => s,
        Err(resp) => { return resp; },
    };

    match action {
        "populate-students" => populate_students(glob.clone()).await,
        "populate-marks" => match header_name_value(&headers, STUDENT_HEADER) {
            Ok(student) => populate_marks(&student, glob.clone()).await,
            Err(resp) => resp,
        },
        "populate-all-marks" => populate_all_marks(glob.clone()).await,
        "save-marks" => save_marks(body, glob.clone()).await,
        x => respond_bad_request(
            format!("{:?} is not a recognized {} value.", &x, ACTION_HEADER)
        ),
    }
}

/// One student's marks as the teacher sees them.
#[derive(Debug, Serialize)]
struct StudentMarks {
    student: String,
    marks: Vec<MarkRecord>,
    notice: Option<&'static str>,
}

/// Body of a `save-marks` request.
#[derive(Debug, Deserialize)]
struct SaveMarks {
    student: String,
    marks: Vec<SubjectMark>,
}

async fn populate_students(glob: Arc<RwLock<Glob>>) -> Response {
    let students = glob.read().await.store.users().students();
    respond_json("populate-students", students)
}

async fn populate_marks(student: &str, glob: Arc<RwLock<Glob>>) -> Response {
    log::trace!("populate_marks( {:?}, Glob ) called.", student);

    let marks = glob.read().await.store.marks().get_marks_by_student(student);
    let notice = if marks.is_empty() { Some(NO_MARKS_YET) } else { None };

    let data = StudentMarks {
        student: student.to_owned(),
        marks,
        notice,
    };
    respond_json("populate-marks", data)
}

async fn populate_all_marks(glob: Arc<RwLock<Glob>>) -> Response {
    let marks = glob.read().await.store.marks().load();
    respond_json("populate-all-marks", marks)
}

async fn save_marks(body: Option<String>, glob: Arc<RwLock<Glob>>) -> Response {
    let body = match body {
        Some(body) => body,
        None => { return respond_bad_request(
            "Request requires application/json body with the student's marks.".to_owned()
        ); },
    };

    let save: SaveMarks = match serde_json::from_str(&body) {
        Ok(s) => s,
        Err(e) => {
            log::error!(
                "Error deserializing JSON {:?} as marks: {}",
                &body, &e
            );
            return respond_bad_request("Unable to deserialize marks.".to_owned());
        },
    };

    {
        let glob = glob.write().await;
        if !glob.store.users().students().contains(&save.student) {
            return respond_bad_request(
                format!("{:?} is not a student.", &save.student)
            );
        }
        match glob.store.marks().replace_student_marks(&save.student, &save.marks) {
            Ok(_) => {},
            Err(SaveError::Rejected(msg)) => {
                return respond_bad_request(msg);
            },
            Err(SaveError::Store(e)) => {
                log::error!(
                    "Error saving marks for {:?}: {}", &save.student, &e
                );
                return text_500(Some(
                    format!("Unable to save marks: {}", &e)
                ));
            },
        }
    }

    populate_marks(&save.student, glob).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use super::super::tests::{
        add_zoe, api_headers, body_text, cleanup, session, test_glob
    };

    async fn call(
        glob: &Arc<RwLock<Glob>>,
        u: &User,
        key: &str,
        action: &str,
        student: Option<&str>,
        body: Option<&str>,
    ) -> Response {
        let mut headers = api_headers(u, key, action);
        if let Some(s) = student {
            headers.insert(
                STUDENT_HEADER,
                HeaderValue::from_str(&urlencoding::encode(s)).unwrap()
            );
        }
        api(
            headers,
            Extension(u.clone()),
            Extension(glob.clone()),
            body.map(|s| s.to_owned()),
        ).await
    }

    #[tokio::test]
    #[serial]
    async fn save_replaces_one_student() {
        let glob = test_glob();
        let (t, key) = session(&glob, "bkhan", "ruler").await;
        let lwong_before = glob.read().await.store.marks().get_marks_by_student("lwong");

        let resp = call(&glob, &t, &key, "save-marks", None, Some(r#"{
            "student": "jsmith",
            "marks": [
                { "subject": "Math", "marks": 55 },
                { "subject": "History", "marks": 71.5 }
            ]
        }"#)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let glob_r = glob.read().await;
        let js = glob_r.store.marks().get_marks_by_student("jsmith");
        assert_eq!(js.len(), 2);
        assert_eq!(&js[1].subject, "History");
        assert_eq!(glob_r.store.marks().get_marks_by_student("lwong"), lwong_before);
        drop(glob_r);

        cleanup(glob).await;
    }

    #[tokio::test]
    #[serial]
    async fn bad_saves_rejected() {
        let glob = test_glob();
        let (t, key) = session(&glob, "amira", "chalk").await;
        let marks_path = glob.read().await.store.marks().path().to_owned();
        let before = std::fs::read_to_string(&marks_path).unwrap();

        // not a student
        let resp = call(&glob, &t, &key, "save-marks", None, Some(
            r#"{"student": "bkhan", "marks": [{"subject": "Math", "marks": 1}]}"#
        )).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = call(&glob, &t, &key, "save-marks", None, Some(
            r#"{"student": "jsmith", "marks": [
                {"subject": "Math", "marks": 1}, {"subject": "MATH", "marks": 2}
            ]}"#
        )).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "Duplicate subject: MATH");

        let resp = call(&glob, &t, &key, "save-marks", None, Some(
            r#"{"student": "jsmith", "marks": [{"subject": " ", "marks": 1}]}"#
        )).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "Fields cannot be empty");

        // a blank marks cell must not turn into a zero
        for bad in [r#"null"#, r#""""#] {
            let body = format!(
                r#"{{"student": "jsmith", "marks": [{{"subject": "Art", "marks": {}}}]}}"#,
                bad
            );
            let resp = call(&glob, &t, &key, "save-marks", None, Some(body.as_str())).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let resp = call(&glob, &t, &key, "save-marks", None, Some("{}")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert_eq!(std::fs::read_to_string(&marks_path).unwrap(), before);
        cleanup(glob).await;
    }

    #[tokio::test]
    #[serial]
    async fn populate_and_permissions() {
        let glob = test_glob();
        let (t, key) = session(&glob, "amira", "chalk").await;

        let resp = call(&glob, &t, &key, "populate-students", None, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = call(&glob, &t, &key, "populate-marks", Some("lwong"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = call(&glob, &t, &key, "populate-marks", None, None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = call(&glob, &t, &key, "populate-all-marks", None, None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let (s, skey) = session(&glob, "jsmith", "apple").await;
        let resp = call(&glob, &s, &skey, "populate-students", None, None).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        cleanup(glob).await;
    }

    #[tokio::test]
    #[serial]
    async fn student_without_marks_gets_notice() {
        let glob = test_glob();
        let zoe = add_zoe(&*glob.read().await);
        let (t, key) = session(&glob, "amira", "chalk").await;

        let resp = call(&glob, &t, &key, "populate-marks", Some(zoe.uname.as_str()), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let data: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(data["student"], json!("zoë"));
        assert_eq!(data["notice"], json!("No marks yet. Add new subjects below."));
        assert_eq!(data["marks"], json!([]));

        let resp = call(&glob, &t, &key, "save-marks", None, Some(
            r#"{"student": "zoë", "marks": [{"subject": "Art", "marks": 77}]}"#
        )).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let data: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert!(data["notice"].is_null());
        assert_eq!(data["marks"][0]["subject"], json!("Art"));

        cleanup(glob).await;
    }

    #[tokio::test]
    #[serial]
    async fn storage_failure_is_a_server_error() {
        let glob = test_glob();
        let (t, key) = session(&glob, "amira", "chalk").await;
        let marks_path = glob.read().await.store.marks().path().to_owned();
        std::fs::remove_file(&marks_path).unwrap();
        std::fs::create_dir(&marks_path).unwrap();

        let resp = call(&glob, &t, &key, "save-marks", None, Some(
            r#"{"student": "jsmith", "marks": [{"subject": "Math", "marks": 50}]}"#
        )).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(marks_path.is_dir());

        std::fs::remove_dir(&marks_path).unwrap();
        cleanup(glob).await;
    }
}
