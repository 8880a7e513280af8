use super::{json_body, ok, respond, with_state, ApiError, State};
use crate::purchase::{Decision, Employee, EmployeeView, NewPurchase, PurchaseError, Role};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection};

#[derive(Debug, Deserialize)]
struct Login {
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePassword {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
}

#[derive(Debug, Default, Deserialize)]
struct DecisionBody {
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewEmployee {
    #[serde(default)]
    name: String,
    role: Role,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct RoleChange {
    role: Role,
}

/// `Authorization: Bearer <token>`, or nothing.
fn token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(|header: Option<String>| {
        header.and_then(|h| {
            h.strip_prefix("Bearer ")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        })
    })
}

async fn actor(state: &State, token: Option<String>) -> Result<Employee, ApiError> {
    let token = token.ok_or(PurchaseError::SessionExpired)?;
    Ok(state.desk.authenticate(&token).await?)
}

fn views(employees: &[Employee]) -> Vec<EmployeeView> {
    employees.iter().map(Employee::view).collect()
}

fn base() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path!("api" / "employee-purchase" / ..)
}

pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let login = base()
        .and(warp::path!("auth" / "login"))
        .and(warp::post())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_login);

    let me = base()
        .and(warp::path!("auth" / "me"))
        .and(warp::get())
        .and(token())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_me);

    let logout = base()
        .and(warp::path!("auth" / "logout"))
        .and(warp::post())
        .and(token())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_logout);

    let change_password = base()
        .and(warp::path!("change-password"))
        .and(warp::post())
        .and(token())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_change_password);

    let submit = base()
        .and(warp::path!("requests"))
        .and(warp::post())
        .and(token())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_submit);

    let my_requests = base()
        .and(warp::path!("requests"))
        .and(warp::get())
        .and(token())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_my_requests);

    let received = base()
        .and(warp::path!("requests" / usize / "received"))
        .and(warp::post())
        .and(token())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_received);

    let review_queue = base()
        .and(warp::path!("admin" / "requests"))
        .and(warp::get())
        .and(token())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_review_queue);

    let decide = base()
        .and(warp::path!("admin" / "requests" / usize / String))
        .and(warp::post())
        .and(token())
        .and(warp::body::bytes())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_decide);

    let report = base()
        .and(warp::path!("reports"))
        .and(warp::get())
        .and(token())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_report);

    let list_employees = base()
        .and(warp::path!("employees"))
        .and(warp::get())
        .and(token())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_list_employees);

    let add_employee = base()
        .and(warp::path!("employees"))
        .and(warp::post())
        .and(token())
        .and(json_body())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_add_employee);

    let remove_employee = base()
        .and(warp::path!("employees" / usize))
        .and(warp::delete())
        .and(token())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_remove_employee);

    let set_role = base()
        .and(warp::path!("employees" / usize / "role"))
        .and(warp::put())
        .and(token())
        .and(json_body())
        .and(with_state(state))
        .and_then(handle_set_role);

    login
        .or(me)
        .unify()
        .or(logout)
        .unify()
        .or(change_password)
        .unify()
        .or(submit)
        .unify()
        .or(my_requests)
        .unify()
        .or(received)
        .unify()
        .or(review_queue)
        .unify()
        .or(decide)
        .unify()
        .or(report)
        .unify()
        .or(list_employees)
        .unify()
        .or(add_employee)
        .unify()
        .or(remove_employee)
        .unify()
        .or(set_role)
        .unify()
        .boxed()
}

async fn handle_login(login: Login, state: Arc<State>) -> Result<Response, Rejection> {
    respond(sign_in(login, &state).await)
}

async fn sign_in(login: Login, state: &State) -> Result<Response, ApiError> {
    let (token, employee) = state.desk.login(login.name.trim(), &login.password).await?;
    Ok(ok(&json!({ "success": true, "token": token, "user": employee.view() })))
}

async fn handle_me(token: Option<String>, state: Arc<State>) -> Result<Response, Rejection> {
    respond(me(token, &state).await)
}

async fn me(token: Option<String>, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    Ok(ok(&json!({ "success": true, "user": employee.view() })))
}

async fn handle_logout(token: Option<String>, state: Arc<State>) -> Result<Response, Rejection> {
    if let Some(token) = token {
        state.desk.logout(&token).await;
    }
    Ok(ok(&json!({ "success": true })))
}

async fn handle_change_password(
    token: Option<String>,
    body: ChangePassword,
    state: Arc<State>,
) -> Result<Response, Rejection> {
    respond(change_password(token, body, &state).await)
}

async fn change_password(token: Option<String>, body: ChangePassword, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    state
        .desk
        .change_pin(&employee, &body.current_password, &body.new_password)
        .await?;
    Ok(ok(&json!({ "success": true, "message": "비밀번호가 변경되었습니다." })))
}

async fn handle_submit(
    token: Option<String>,
    purchase: NewPurchase,
    state: Arc<State>,
) -> Result<Response, Rejection> {
    respond(submit(token, purchase, &state).await)
}

async fn submit(token: Option<String>, purchase: NewPurchase, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    let request = state.desk.submit(&employee, purchase).await?;
    Ok(ok(&json!({ "success": true, "request": request })))
}

async fn handle_my_requests(token: Option<String>, state: Arc<State>) -> Result<Response, Rejection> {
    respond(my_requests(token, &state).await)
}

async fn my_requests(token: Option<String>, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    let requests = state.desk.my_requests(&employee).await;
    Ok(ok(&json!({ "success": true, "requests": requests })))
}

async fn handle_received(id: usize, token: Option<String>, state: Arc<State>) -> Result<Response, Rejection> {
    respond(received(id, token, &state).await)
}

async fn received(id: usize, token: Option<String>, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    let request = state.desk.mark_received(&employee, id).await?;
    Ok(ok(&json!({ "success": true, "request": request })))
}

async fn handle_review_queue(token: Option<String>, state: Arc<State>) -> Result<Response, Rejection> {
    respond(review_queue(token, &state).await)
}

async fn review_queue(token: Option<String>, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    let requests = state.desk.review_queue(&employee).await?;
    Ok(ok(&json!({ "success": true, "requests": requests })))
}

async fn handle_decide(
    id: usize,
    action: String,
    token: Option<String>,
    body: Bytes,
    state: Arc<State>,
) -> Result<Response, Rejection> {
    let decision = match action.as_str() {
        "approve" => Decision::Approve,
        "reject" => Decision::Reject,
        _ => return Err(warp::reject::not_found()),
    };
    respond(decide(id, decision, token, body, &state).await)
}

async fn decide(
    id: usize,
    decision: Decision,
    token: Option<String>,
    body: Bytes,
    state: &State,
) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    // the note is optional, and so is the body carrying it
    let body: DecisionBody = if body.is_empty() {
        DecisionBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|_| ApiError::validation("요청 본문 형식이 올바르지 않습니다."))?
    };
    let request = state.desk.decide(&employee, id, decision, body.note).await?;
    Ok(ok(&json!({ "success": true, "request": request })))
}

async fn handle_report(token: Option<String>, state: Arc<State>) -> Result<Response, Rejection> {
    respond(report(token, &state).await)
}

async fn report(token: Option<String>, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    let report = state.desk.report(&employee).await?;
    Ok(ok(&json!({ "success": true, "report": report })))
}

async fn handle_list_employees(token: Option<String>, state: Arc<State>) -> Result<Response, Rejection> {
    respond(list_employees(token, &state).await)
}

async fn list_employees(token: Option<String>, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    let employees = state.desk.list_employees(&employee).await?;
    Ok(ok(&json!({ "success": true, "employees": views(&employees) })))
}

async fn handle_add_employee(
    token: Option<String>,
    new: NewEmployee,
    state: Arc<State>,
) -> Result<Response, Rejection> {
    respond(add_employee(token, new, &state).await)
}

async fn add_employee(token: Option<String>, new: NewEmployee, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    let added = state
        .desk
        .add_employee(&employee, new.name.trim(), new.role, &new.password)
        .await?;
    Ok(ok(&json!({ "success": true, "employee": added.view() })))
}

async fn handle_remove_employee(
    id: usize,
    token: Option<String>,
    state: Arc<State>,
) -> Result<Response, Rejection> {
    respond(remove_employee(id, token, &state).await)
}

async fn remove_employee(id: usize, token: Option<String>, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    state.desk.remove_employee(&employee, id).await?;
    Ok(ok(&json!({ "success": true, "message": "직원이 삭제되었습니다." })))
}

async fn handle_set_role(
    id: usize,
    token: Option<String>,
    change: RoleChange,
    state: Arc<State>,
) -> Result<Response, Rejection> {
    respond(set_role(id, token, change, &state).await)
}

async fn set_role(id: usize, token: Option<String>, change: RoleChange, state: &State) -> Result<Response, ApiError> {
    let employee = actor(state, token).await?;
    let updated = state.desk.set_role(&employee, id, change.role).await?;
    Ok(ok(&json!({ "success": true, "employee": updated.view() })))
}
