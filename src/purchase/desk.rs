use super::storage::{Storage, EMPLOYEES, REQUESTS};
use super::{
    validate_pin, Decision, Employee, NewPurchase, PurchaseError, PurchaseRequest, Role, Status,
};
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};

/// Upper bound for a single request amount, in won.
pub const MAX_AMOUNT: u64 = 100_000_000;

pub struct DeskConfig {
    pub storage_dir: String,
    pub owner_name: String,
    pub owner_pin: String,
    pub idle_timeout: Duration,
}

#[derive(Default)]
struct Ledger {
    employees: Vec<Employee>,
    requests: Vec<PurchaseRequest>,
}

struct Session {
    employee_id: usize,
    last_seen: Instant,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct Totals {
    pub count: usize,
    pub amount: u64,
}

impl Totals {
    fn add(&mut self, amount: u64) {
        self.count += 1;
        self.amount = self.amount.saturating_add(amount);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeTotals {
    pub employee_id: usize,
    pub name: String,
    pub requested: Totals,
    pub approved: Totals,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub total: Totals,
    /// Approved and completed requests.
    pub approved: Totals,
    pub by_status: BTreeMap<Status, Totals>,
    pub by_employee: Vec<EmployeeTotals>,
}

#[derive(Clone)]
pub struct PurchaseDesk {
    storage: Storage,
    ledger: Arc<RwLock<Ledger>>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    idle_timeout: Duration,
    semaphore: Arc<Semaphore>,
}

impl PurchaseDesk {
    pub async fn open(config: &DeskConfig) -> Result<Self> {
        let storage = Storage::new(&config.storage_dir)?;
        let employees: Vec<Employee> = storage.load_all(EMPLOYEES).await?;
        let requests: Vec<PurchaseRequest> = storage.load_all(REQUESTS).await?;
        info!(
            "purchase desk init, recover: employees: {}, requests: {}",
            employees.len(),
            requests.len()
        );

        let desk = Self {
            storage,
            ledger: Arc::new(RwLock::new(Ledger {
                employees,
                requests,
            })),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout: config.idle_timeout,
            semaphore: Arc::new(Semaphore::new(1)),
        };

        if desk.ledger.read().await.employees.is_empty() {
            validate_pin(&config.owner_pin)
                .map_err(|_| anyhow::anyhow!("owner pin must be four digits"))?;
            let owner = Employee::new(0, &config.owner_name, Role::Owner, &config.owner_pin);
            desk.save_employee(owner).await?;
            warn!("no employees found, created owner account: {}", config.owner_name);
        }

        Ok(desk)
    }

    async fn save_employee(&self, employee: Employee) -> Result<Employee, PurchaseError> {
        self.storage.put(EMPLOYEES, employee.id, &employee).await?;
        let mut ledger = self.ledger.write().await;
        match ledger.employees.get_mut(employee.id) {
            Some(slot) => *slot = employee.clone(),
            None => ledger.employees.push(employee.clone()),
        }
        Ok(employee)
    }

    async fn save_request(&self, request: PurchaseRequest) -> Result<PurchaseRequest, PurchaseError> {
        self.storage.put(REQUESTS, request.id, &request).await?;
        let mut ledger = self.ledger.write().await;
        match ledger.requests.get_mut(request.id) {
            Some(slot) => *slot = request.clone(),
            None => ledger.requests.push(request.clone()),
        }
        Ok(request)
    }

    pub async fn login(&self, name: &str, pin: &str) -> Result<(String, Employee), PurchaseError> {
        let employee = {
            let ledger = self.ledger.read().await;
            ledger
                .employees
                .iter()
                .find(|e| e.active && e.name == name)
                .cloned()
        };
        let employee = match employee {
            Some(employee) if employee.verify_pin(pin) => employee,
            _ => {
                warn!("login failed for {}", name);
                return Err(PurchaseError::InvalidCredentials);
            }
        };

        let token = uuid::Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.write().await;
        let idle_timeout = self.idle_timeout;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen.elapsed() <= idle_timeout);
        if sessions.len() < before {
            debug!("dropped {} idle sessions", before - sessions.len());
        }
        sessions.insert(
            token.clone(),
            Session {
                employee_id: employee.id,
                last_seen: Instant::now(),
            },
        );
        drop(sessions);
        info!("{} logged in as {}", employee.name, employee.role.title());
        Ok((token, employee))
    }

    pub async fn logout(&self, token: &str) {
        if let Some(session) = self.sessions.write().await.remove(token) {
            debug!("employee {} logged out", session.employee_id);
        }
    }

    /// Resolves a session token, refreshing its idle timer.
    pub async fn authenticate(&self, token: &str) -> Result<Employee, PurchaseError> {
        let mut sessions = self.sessions.write().await;
        let fresh = {
            let session = sessions
                .get_mut(token)
                .ok_or(PurchaseError::SessionExpired)?;
            if session.last_seen.elapsed() <= self.idle_timeout {
                session.last_seen = Instant::now();
                Some(session.employee_id)
            } else {
                None
            }
        };
        let Some(employee_id) = fresh else {
            debug!("session expired after {:?} idle", self.idle_timeout);
            sessions.remove(token);
            return Err(PurchaseError::SessionExpired);
        };

        let ledger = self.ledger.read().await;
        match ledger.employees.get(employee_id) {
            Some(employee) if employee.active => Ok(employee.clone()),
            _ => {
                sessions.remove(token);
                Err(PurchaseError::SessionExpired)
            }
        }
    }

    pub async fn change_pin(
        &self,
        actor: &Employee,
        current: &str,
        new: &str,
    ) -> Result<(), PurchaseError> {
        validate_pin(new)?;
        let _permit = self.semaphore.acquire().await;
        let mut employee = self.employee(actor.id).await?;
        if !employee.verify_pin(current) {
            return Err(PurchaseError::InvalidCredentials);
        }
        employee.set_pin(new);
        self.save_employee(employee).await?;
        info!("{} changed pin", actor.name);
        Ok(())
    }

    async fn employee(&self, id: usize) -> Result<Employee, PurchaseError> {
        self.ledger
            .read()
            .await
            .employees
            .get(id)
            .cloned()
            .ok_or(PurchaseError::NotFound("employee", id))
    }

    async fn request(&self, id: usize) -> Result<PurchaseRequest, PurchaseError> {
        self.ledger
            .read()
            .await
            .requests
            .get(id)
            .cloned()
            .ok_or(PurchaseError::NotFound("request", id))
    }

    fn require_owner(actor: &Employee) -> Result<(), PurchaseError> {
        if actor.role == Role::Owner {
            Ok(())
        } else {
            Err(PurchaseError::Forbidden("owner only"))
        }
    }

    pub async fn list_employees(&self, actor: &Employee) -> Result<Vec<Employee>, PurchaseError> {
        Self::require_owner(actor)?;
        let ledger = self.ledger.read().await;
        Ok(ledger.employees.iter().filter(|e| e.active).cloned().collect())
    }

    pub async fn add_employee(
        &self,
        actor: &Employee,
        name: &str,
        role: Role,
        pin: &str,
    ) -> Result<Employee, PurchaseError> {
        Self::require_owner(actor)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(PurchaseError::Invalid("이름은 필수 입력 항목입니다.".to_string()));
        }
        validate_pin(pin)?;

        let _permit = self.semaphore.acquire().await;
        let id = {
            let ledger = self.ledger.read().await;
            if ledger.employees.iter().any(|e| e.active && e.name == name) {
                return Err(PurchaseError::Conflict(format!("이미 등록된 이름입니다: {}", name)));
            }
            ledger.employees.len()
        };
        let employee = self.save_employee(Employee::new(id, name, role, pin)).await?;
        info!("{} added {} as {}", actor.name, employee.name, role.title());
        Ok(employee)
    }

    pub async fn remove_employee(&self, actor: &Employee, id: usize) -> Result<(), PurchaseError> {
        Self::require_owner(actor)?;
        if actor.id == id {
            return Err(PurchaseError::Invalid("자기 자신은 삭제할 수 없습니다.".to_string()));
        }

        let _permit = self.semaphore.acquire().await;
        let mut employee = self.employee(id).await?;
        employee.active = false;
        self.save_employee(employee).await?;
        self.sessions.write().await.retain(|_, s| s.employee_id != id);
        info!("{} removed employee {}", actor.name, id);
        Ok(())
    }

    pub async fn set_role(&self, actor: &Employee, id: usize, role: Role) -> Result<Employee, PurchaseError> {
        Self::require_owner(actor)?;
        if actor.id == id {
            return Err(PurchaseError::Invalid("자신의 권한은 변경할 수 없습니다.".to_string()));
        }

        let _permit = self.semaphore.acquire().await;
        let mut employee = self.employee(id).await?;
        if !employee.active {
            return Err(PurchaseError::NotFound("employee", id));
        }
        employee.role = role;
        let employee = self.save_employee(employee).await?;
        info!("{} set role of {} to {}", actor.name, employee.name, role.title());
        Ok(employee)
    }

    pub async fn submit(&self, actor: &Employee, purchase: NewPurchase) -> Result<PurchaseRequest, PurchaseError> {
        if !actor.role.can_submit() {
            return Err(PurchaseError::Forbidden("master cannot submit requests"));
        }
        let item_name = purchase.item_name.trim();
        if item_name.is_empty() {
            return Err(PurchaseError::Invalid("물품명은 필수 입력 항목입니다.".to_string()));
        }
        if purchase.quantity == 0 {
            return Err(PurchaseError::Invalid("수량은 1개 이상이어야 합니다.".to_string()));
        }
        if purchase.amount == 0 {
            return Err(PurchaseError::Invalid("정확한 금액을 입력해주세요.".to_string()));
        }
        if purchase.amount > MAX_AMOUNT {
            return Err(PurchaseError::Invalid(format!(
                "금액은 {}원 이하로 입력해주세요.",
                MAX_AMOUNT
            )));
        }
        if purchase.photo_url.trim().is_empty() {
            return Err(PurchaseError::Invalid("물품 사진을 첨부해주세요.".to_string()));
        }

        let _permit = self.semaphore.acquire().await;
        let start = Instant::now();
        let id = self.ledger.read().await.requests.len();
        let request = PurchaseRequest {
            id,
            requester_id: actor.id,
            requester_name: actor.name.clone(),
            requester_role: actor.role,
            item_name: item_name.to_string(),
            quantity: purchase.quantity,
            amount: purchase.amount,
            photo_url: purchase.photo_url,
            note: purchase.note.filter(|n| !n.trim().is_empty()),
            status: Status::Pending,
            decided_by: None,
            decision_note: None,
            created_at: Utc::now(),
            decided_at: None,
            completed_at: None,
        };
        let request = self.save_request(request).await?;
        let elapsed = start.elapsed().as_secs_f64();
        info!(
            "request {} by {} persisted in {}s: {} x{} ({} won)",
            request.id, actor.name, elapsed, request.item_name, request.quantity, request.amount
        );
        Ok(request)
    }

    /// The actor's own requests, newest first.
    pub async fn my_requests(&self, actor: &Employee) -> Vec<PurchaseRequest> {
        let ledger = self.ledger.read().await;
        ledger
            .requests
            .iter()
            .rev()
            .filter(|r| r.requester_id == actor.id)
            .cloned()
            .collect()
    }

    /// Pending requests the actor may decide on, oldest first.
    pub async fn review_queue(&self, actor: &Employee) -> Result<Vec<PurchaseRequest>, PurchaseError> {
        if !actor.role.can_review() {
            return Err(PurchaseError::Forbidden("secretary or master only"));
        }
        let ledger = self.ledger.read().await;
        Ok(ledger
            .requests
            .iter()
            .filter(|r| r.status == Status::Pending)
            .filter(|r| r.requester_id != actor.id && actor.role.can_decide_for(r.requester_role))
            .cloned()
            .collect())
    }

    pub async fn decide(
        &self,
        actor: &Employee,
        id: usize,
        decision: Decision,
        note: Option<String>,
    ) -> Result<PurchaseRequest, PurchaseError> {
        let _permit = self.semaphore.acquire().await;
        let mut request = self.request(id).await?;
        if request.requester_id == actor.id || !actor.role.can_decide_for(request.requester_role) {
            return Err(PurchaseError::Forbidden("cannot decide on this request"));
        }
        if request.status != Status::Pending {
            return Err(PurchaseError::Conflict("이미 처리된 요청입니다.".to_string()));
        }

        request.status = match decision {
            Decision::Approve => Status::Approved,
            Decision::Reject => Status::Rejected,
        };
        request.decided_by = Some(actor.name.clone());
        request.decision_note = note.filter(|n| !n.trim().is_empty());
        request.decided_at = Some(Utc::now());
        let request = self.save_request(request).await?;
        info!("request {} {:?} by {}", request.id, request.status, actor.name);
        Ok(request)
    }

    /// The requester confirms an approved purchase was collected.
    pub async fn mark_received(&self, actor: &Employee, id: usize) -> Result<PurchaseRequest, PurchaseError> {
        let _permit = self.semaphore.acquire().await;
        let mut request = self.request(id).await?;
        if request.requester_id != actor.id {
            return Err(PurchaseError::Forbidden("requester only"));
        }
        if request.status != Status::Approved {
            return Err(PurchaseError::Conflict("승인된 요청만 수령할 수 있습니다.".to_string()));
        }
        request.status = Status::Completed;
        request.completed_at = Some(Utc::now());
        let request = self.save_request(request).await?;
        info!("request {} received by {}", request.id, actor.name);
        Ok(request)
    }

    pub async fn report(&self, actor: &Employee) -> Result<Report, PurchaseError> {
        Self::require_owner(actor)?;
        let ledger = self.ledger.read().await;

        let mut total = Totals::default();
        let mut approved = Totals::default();
        let mut by_status: BTreeMap<Status, Totals> = BTreeMap::new();
        let mut by_employee: BTreeMap<usize, EmployeeTotals> = BTreeMap::new();

        for request in ledger.requests.iter() {
            total.add(request.amount);
            by_status.entry(request.status).or_default().add(request.amount);

            let entry = by_employee
                .entry(request.requester_id)
                .or_insert_with(|| EmployeeTotals {
                    employee_id: request.requester_id,
                    name: request.requester_name.clone(),
                    requested: Totals::default(),
                    approved: Totals::default(),
                });
            entry.requested.add(request.amount);

            if matches!(request.status, Status::Approved | Status::Completed) {
                approved.add(request.amount);
                entry.approved.add(request.amount);
            }
        }

        Ok(Report {
            total,
            approved,
            by_status,
            by_employee: by_employee.into_values().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::storage::temp_datadir;

    fn config(dir: &str) -> DeskConfig {
        DeskConfig {
            storage_dir: dir.to_string(),
            owner_name: "master".to_string(),
            owner_pin: "0000".to_string(),
            idle_timeout: Duration::from_secs(300),
        }
    }

    fn purchase(item: &str, amount: u64) -> NewPurchase {
        NewPurchase {
            item_name: item.to_string(),
            quantity: 1,
            amount,
            photo_url: "https://img/item.jpg".to_string(),
            note: None,
        }
    }

    struct Team {
        desk: PurchaseDesk,
        owner: Employee,
        manager: Employee,
        staff: Employee,
    }

    async fn team() -> Team {
        let desk = PurchaseDesk::open(&config(&temp_datadir())).await.unwrap();
        let (_, owner) = desk.login("master", "0000").await.unwrap();
        let manager = desk
            .add_employee(&owner, "secretary", Role::Manager, "1111")
            .await
            .unwrap();
        let staff = desk
            .add_employee(&owner, "family", Role::Staff, "2222")
            .await
            .unwrap();
        Team {
            desk,
            owner,
            manager,
            staff,
        }
    }

    #[tokio::test]
    async fn test_owner_seeded_once_and_reloaded() {
        let dir = temp_datadir();
        {
            let desk = PurchaseDesk::open(&config(&dir)).await.unwrap();
            let (_, owner) = desk.login("master", "0000").await.unwrap();
            desk.add_employee(&owner, "kim", Role::Staff, "1234").await.unwrap();
        }
        // sled releases the directory once every handle is dropped
        tokio::time::sleep(Duration::from_millis(100)).await;

        let desk = PurchaseDesk::open(&config(&dir)).await.unwrap();
        let (_, owner) = desk.login("master", "0000").await.unwrap();
        let names = desk
            .list_employees(&owner)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["master", "kim"]);
    }

    #[tokio::test]
    async fn test_login_and_session() {
        let t = team().await;

        assert!(matches!(
            t.desk.login("family", "9999").await,
            Err(PurchaseError::InvalidCredentials)
        ));
        let (token, employee) = t.desk.login("family", "2222").await.unwrap();
        assert_eq!(employee.id, t.staff.id);
        assert_eq!(t.desk.authenticate(&token).await.unwrap().name, "family");

        t.desk.logout(&token).await;
        assert!(matches!(
            t.desk.authenticate(&token).await,
            Err(PurchaseError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_session_expires_when_idle() {
        let mut cfg = config(&temp_datadir());
        cfg.idle_timeout = Duration::from_millis(20);
        let desk = PurchaseDesk::open(&cfg).await.unwrap();
        let (token, _) = desk.login("master", "0000").await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(matches!(
            desk.authenticate(&token).await,
            Err(PurchaseError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_login_drops_idle_sessions() {
        let mut cfg = config(&temp_datadir());
        cfg.idle_timeout = Duration::from_millis(20);
        let desk = PurchaseDesk::open(&cfg).await.unwrap();
        for _ in 0..3 {
            desk.login("master", "0000").await.unwrap();
        }
        assert_eq!(desk.sessions.read().await.len(), 3);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let (token, _) = desk.login("master", "0000").await.unwrap();

        let sessions = desk.sessions.read().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key(&token));
    }

    #[tokio::test]
    async fn test_change_pin() {
        let t = team().await;

        assert!(t.desk.change_pin(&t.staff, "2222", "12").await.is_err());
        assert!(matches!(
            t.desk.change_pin(&t.staff, "0000", "3333").await,
            Err(PurchaseError::InvalidCredentials)
        ));
        t.desk.change_pin(&t.staff, "2222", "3333").await.unwrap();

        assert!(t.desk.login("family", "2222").await.is_err());
        assert!(t.desk.login("family", "3333").await.is_ok());
    }

    #[tokio::test]
    async fn test_owner_cannot_submit() {
        let t = team().await;
        assert!(matches!(
            t.desk.submit(&t.owner, purchase("커피", 5000)).await,
            Err(PurchaseError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let t = team().await;
        let mut no_photo = purchase("커피", 5000);
        no_photo.photo_url = " ".to_string();

        for bad in [
            purchase("", 5000),
            purchase("커피", 0),
            purchase("커피", MAX_AMOUNT + 1),
            purchase("커피", u64::MAX),
            no_photo,
        ] {
            assert!(matches!(
                t.desk.submit(&t.staff, bad).await,
                Err(PurchaseError::Invalid(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_manager_decides_only_staff_requests() {
        let t = team().await;
        let staff_request = t.desk.submit(&t.staff, purchase("샴푸", 12000)).await.unwrap();
        let manager_request = t.desk.submit(&t.manager, purchase("린스", 9000)).await.unwrap();

        let queue = t.desk.review_queue(&t.manager).await.unwrap();
        assert_eq!(queue.iter().map(|r| r.id).collect::<Vec<_>>(), vec![staff_request.id]);

        assert!(matches!(
            t.desk.decide(&t.manager, manager_request.id, Decision::Approve, None).await,
            Err(PurchaseError::Forbidden(_))
        ));
        assert!(matches!(
            t.desk.review_queue(&t.staff).await,
            Err(PurchaseError::Forbidden(_))
        ));

        let approved = t
            .desk
            .decide(&t.manager, staff_request.id, Decision::Approve, Some("ok".to_string()))
            .await
            .unwrap();
        assert_eq!(approved.status, Status::Approved);
        assert_eq!(approved.decided_by.as_deref(), Some("secretary"));

        let owner_queue = t.desk.review_queue(&t.owner).await.unwrap();
        assert_eq!(owner_queue.iter().map(|r| r.id).collect::<Vec<_>>(), vec![manager_request.id]);
        let rejected = t
            .desk
            .decide(&t.owner, manager_request.id, Decision::Reject, None)
            .await
            .unwrap();
        assert_eq!(rejected.status, Status::Rejected);

        assert!(matches!(
            t.desk.decide(&t.owner, staff_request.id, Decision::Reject, None).await,
            Err(PurchaseError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_only_approved_requests_can_be_received() {
        let t = team().await;
        let request = t.desk.submit(&t.staff, purchase("샴푸", 12000)).await.unwrap();

        assert!(matches!(
            t.desk.mark_received(&t.staff, request.id).await,
            Err(PurchaseError::Conflict(_))
        ));
        t.desk
            .decide(&t.owner, request.id, Decision::Approve, None)
            .await
            .unwrap();
        assert!(matches!(
            t.desk.mark_received(&t.manager, request.id).await,
            Err(PurchaseError::Forbidden(_))
        ));

        let done = t.desk.mark_received(&t.staff, request.id).await.unwrap();
        assert_eq!(done.status, Status::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_report_totals() {
        let t = team().await;
        let a = t.desk.submit(&t.staff, purchase("a", 1000)).await.unwrap();
        t.desk.submit(&t.staff, purchase("b", 2000)).await.unwrap();
        let c = t.desk.submit(&t.manager, purchase("c", 4000)).await.unwrap();
        t.desk.decide(&t.manager, a.id, Decision::Approve, None).await.unwrap();
        t.desk.decide(&t.owner, c.id, Decision::Approve, None).await.unwrap();

        assert!(t.desk.report(&t.manager).await.is_err());
        let report = t.desk.report(&t.owner).await.unwrap();

        assert_eq!(report.total.count, 3);
        assert_eq!(report.total.amount, 7000);
        assert_eq!(report.approved.amount, 5000);
        assert_eq!(report.by_status[&Status::Pending].amount, 2000);
        assert_eq!(report.by_employee.len(), 2);
        assert_eq!(report.by_employee[0].name, "secretary");
        assert_eq!(report.by_employee[0].approved.amount, 4000);
        assert_eq!(report.by_employee[1].requested.count, 2);
    }

    #[tokio::test]
    async fn test_report_at_amount_ceiling() {
        let t = team().await;
        t.desk.submit(&t.staff, purchase("a", MAX_AMOUNT)).await.unwrap();
        t.desk.submit(&t.staff, purchase("b", 1)).await.unwrap();

        let report = t.desk.report(&t.owner).await.unwrap();
        assert_eq!(report.total.count, 2);
        assert_eq!(report.total.amount, MAX_AMOUNT + 1);
    }

    #[test]
    fn test_totals_saturate() {
        let mut totals = Totals::default();
        totals.add(u64::MAX);
        totals.add(1);

        assert_eq!(totals.count, 2);
        assert_eq!(totals.amount, u64::MAX);
    }

    #[tokio::test]
    async fn test_employee_management() {
        let t = team().await;

        assert!(matches!(
            t.desk.add_employee(&t.manager, "x", Role::Staff, "1234").await,
            Err(PurchaseError::Forbidden(_))
        ));
        assert!(matches!(
            t.desk.add_employee(&t.owner, "family", Role::Staff, "1234").await,
            Err(PurchaseError::Conflict(_))
        ));
        assert!(t.desk.remove_employee(&t.owner, t.owner.id).await.is_err());

        let promoted = t.desk.set_role(&t.owner, t.staff.id, Role::Manager).await.unwrap();
        assert_eq!(promoted.role, Role::Manager);

        let (token, _) = t.desk.login("family", "2222").await.unwrap();
        t.desk.remove_employee(&t.owner, t.staff.id).await.unwrap();
        assert!(t.desk.authenticate(&token).await.is_err());
        assert!(t.desk.login("family", "2222").await.is_err());

        // the name is free again once its holder is gone
        t.desk
            .add_employee(&t.owner, "family", Role::Staff, "4444")
            .await
            .unwrap();
    }
}
