/*!
Displaying an individual student's marks and statistics.
*/
use crate::report::{round2, Report};
use super::*;

/// Template data for the student page; numbers pre-rounded for display.
fn report_data(u: &User, key: &str, r: &Report) -> serde_json::Value {
    let summary = r.summary.as_ref().map(|s| json!({
        "average": round2(s.average),
        "weak": &s.weak,
        "prediction": s.prediction.as_ref().map(|p| json!({
            "predicted": round2(p.predicted),
            "trend": p.trend,
            "message": p.message,
        })),
        "advice": &s.advice,
        "standing": s.standing,
        "standing_message": s.standing_message,
    }));

    json!({
        "uname": &u.uname,
        "key": key,
        "records": &r.records,
        "notice": r.notice,
        "summary": summary,
    })
}

pub async fn login(
    u: User,
    key: String,
    glob: Arc<RwLock<Glob>>
) -> Response {
    log::trace!("student::login( {:?}, ... ) called.", &u.uname);

    let records = glob.read().await.store.marks().get_marks_by_student(&u.uname);
    let report = Report::for_student(&u.uname, records);

    serve_template(
        StatusCode::OK,
        "student",
        &report_data(&u, &key, &report),
        vec![]
    )
}

pub async fn api(
    headers: HeaderMap,
    Extension(u): Extension<User>,
    Extension(glob): Extension<Arc<RwLock<Glob>>>,
) -> Response {
    if let Err(resp) = require_role(&u, Role::Student) {
        return resp;
    }

    let action = match header_str(&headers, ACTION_HEADER) {
        Ok(s) => s,
        Err(resp) => { return resp; },
    };

    match action {
        "report" => {
            let records = glob.read().await.store.marks().get_marks_by_student(&u.uname);
            respond_json("report", Report::for_student(&u.uname, records))
        },
        x => respond_bad_request(
            format!("{:?} is not a recognized {} value.", &x, ACTION_HEADER)
        ),
    }
}
