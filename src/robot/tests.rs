use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tempfile::TempDir;

use super::resource::resource_path;
use super::*;
use crate::auth::Caller;
use crate::error::{Error, Result};
use crate::store::{SqliteStore, Store};
use crate::types::*;

const LIBRARY: i64 = 1;
const OTHER: i64 = 2;

struct MemoryProjects(HashMap<i64, &'static str>);

impl MemoryProjects {
    fn new() -> Self {
        Self(HashMap::from([(LIBRARY, "library"), (OTHER, "other")]))
    }
}

impl ProjectResolver for MemoryProjects {
    fn resolve(&self, id_or_name: &str) -> Result<ProjectScope> {
        let found = match parse_project_id(id_or_name) {
            Some(id) => self.0.get(&id).map(|name| (id, *name)),
            None => self
                .0
                .iter()
                .find(|(_, name)| **name == id_or_name)
                .map(|(id, name)| (*id, *name)),
        };
        found
            .map(|(project_id, name)| ProjectScope {
                project_id,
                project_name: name.to_string(),
            })
            .ok_or_else(|| Error::ProjectNotFound(id_or_name.to_string()))
    }
}

#[derive(Default)]
struct MemoryRobots {
    rows: Mutex<Vec<Robot>>,
    next_id: AtomicI64,
    writes: AtomicUsize,
    last_update: Mutex<Option<RobotChanges>>,
    /// Simulates a concurrent delete between lookup and removal.
    vanish_on_delete: AtomicBool,
    fail_delete: AtomicBool,
}

impl MemoryRobots {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn matches(robot: &Robot, filter: &RobotFilter) -> bool {
        robot.project_id == filter.project_id
            && filter.id.is_none_or(|id| robot.id == id)
            && filter.disabled.is_none_or(|d| robot.disabled == d)
            && match &filter.name {
                Some(NameMatch::Exact(n)) => &robot.name == n,
                Some(NameMatch::Fuzzy(n)) => robot.name.contains(n.as_str()),
                None => true,
            }
    }
}

impl RobotStore for MemoryRobots {
    fn list_robots(&self, filter: &RobotFilter, page: Option<&Page>) -> Result<Vec<Robot>> {
        let rows = self.rows.lock().unwrap();
        let matching = rows.iter().filter(|r| Self::matches(r, filter)).cloned();
        Ok(match page {
            Some(page) => matching
                .skip(page.offset() as usize)
                .take(page.size as usize)
                .collect(),
            None => matching.collect(),
        })
    }

    fn count_robots(&self, filter: &RobotFilter) -> Result<i64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().filter(|r| Self::matches(r, filter)).count() as i64)
    }

    fn create_robot(&self, robot: &NewRobot) -> Result<Robot> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.project_id == robot.project_id && r.name == robot.name)
        {
            return Err(Error::AlreadyExists);
        }
        let created = Robot {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            project_id: robot.project_id,
            name: robot.name.clone(),
            description: robot.description.clone(),
            secret_hash: robot.secret_hash.clone(),
            disabled: false,
            expires_at: robot.expires_at,
            level: robot.level,
            permissions: robot.permissions.clone(),
            creation_time: robot.creation_time,
            update_time: robot.creation_time,
        };
        rows.push(created.clone());
        Ok(created)
    }

    fn update_robot(&self, project_id: i64, id: i64, changes: &RobotChanges) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let robot = rows
            .iter_mut()
            .find(|r| r.project_id == project_id && r.id == id)
            .ok_or(Error::NotFound)?;
        if let Some(disabled) = changes.disabled {
            robot.disabled = disabled;
        }
        if let Some(description) = &changes.description {
            robot.description.clone_from(description);
        }
        *self.last_update.lock().unwrap() = Some(changes.clone());
        Ok(())
    }

    fn delete_robot(&self, project_id: i64, id: i64) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("disk unavailable")));
        }
        let mut rows = self.rows.lock().unwrap();
        if self.vanish_on_delete.load(Ordering::SeqCst) {
            rows.retain(|r| r.id != id);
            return Err(Error::NotFound);
        }
        let before = rows.len();
        rows.retain(|r| !(r.project_id == project_id && r.id == id));
        if rows.len() == before {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn robot_exists(&self, id: i64) -> Result<bool> {
        Ok(self.rows.lock().unwrap().iter().any(|r| r.id == id))
    }
}

struct AllowAll;

impl AccessGate for AllowAll {
    fn require_access(&self, _: &Caller, _: &ProjectScope, _: RobotAction) -> Result<()> {
        Ok(())
    }
}

struct DenyAll;

impl AccessGate for DenyAll {
    fn require_access(&self, _: &Caller, _: &ProjectScope, _: RobotAction) -> Result<()> {
        Err(Error::Forbidden)
    }
}

fn manager_with(gate: Arc<dyn AccessGate>) -> (RobotManager, Arc<MemoryRobots>) {
    let robots = Arc::new(MemoryRobots::default());
    let manager = RobotManager::new(
        Arc::new(MemoryProjects::new()),
        Arc::new(StaticCatalog::builtin()),
        robots.clone(),
        gate,
    );
    (manager, robots)
}

fn manager() -> (RobotManager, Arc<MemoryRobots>) {
    manager_with(Arc::new(AllowAll))
}

fn admin() -> RequestContext {
    RequestContext::new(Caller::Admin {
        token_id: "tok-admin".to_string(),
    })
}

fn pull_request(project_id: i64) -> AccessRequest {
    AccessRequest::new("pull", resource_path(project_id, "repository"), "")
}

fn create_request(name: &str) -> CreateRobot {
    CreateRobot {
        name: name.to_string(),
        description: "ci pipeline".to_string(),
        expires_at: None,
        access: vec![pull_request(LIBRARY)],
    }
}

fn create(manager: &RobotManager, name: &str) -> Robot {
    manager
        .create(&admin(), "library", create_request(name))
        .unwrap()
        .robot
}

#[test]
fn test_create_returns_secret_and_permissions() {
    let (manager, robots) = manager();

    let created = manager
        .create(&admin(), "library", create_request("ci"))
        .unwrap();

    assert_eq!(created.secret.len(), 32);
    assert_ne!(created.robot.secret_hash, created.secret);
    assert_eq!(created.robot.project_id, LIBRARY);
    assert_eq!(created.robot.level, RobotLevel::Project);
    assert_eq!(
        created.robot.permissions,
        vec![RobotPermission::project(
            "library",
            vec![Policy::allow("repository", "pull")]
        )]
    );
    assert_eq!(robots.writes(), 1);
}

#[test]
fn test_create_by_project_id() {
    let (manager, _) = manager();
    let created = manager
        .create(&admin(), "2", create_request("ci"))
        .unwrap();
    assert_eq!(created.robot.project_id, OTHER);
    // The grant names /project/1/...; scope comes from the URL project.
    assert_eq!(created.robot.permissions[0].namespace, "other");
    assert_eq!(
        created.robot.permissions[0].access,
        vec![Policy::allow("repository", "pull")]
    );
}

#[test]
fn test_create_empty_grants() {
    let (manager, robots) = manager();
    let req = CreateRobot {
        access: Vec::new(),
        ..create_request("ci")
    };

    let err = manager.create(&admin(), "library", req).unwrap_err();
    assert!(matches!(err, Error::EmptyGrantSet));
    assert_eq!(robots.writes(), 0);
}

#[test]
fn test_create_grant_not_in_catalog_persists_nothing() {
    let (manager, robots) = manager();
    let req = CreateRobot {
        access: vec![
            pull_request(LIBRARY),
            AccessRequest::new("fly", resource_path(LIBRARY, "repository"), ""),
        ],
        ..create_request("ci")
    };

    let err = manager.create(&admin(), "library", req).unwrap_err();
    assert_eq!(
        err.to_string(),
        "fly action of /project/1/repository resource not exist in project library"
    );
    assert_eq!(robots.len(), 0);
    assert_eq!(robots.writes(), 0);
}

#[test]
fn test_create_rejects_bad_resource_and_past_expiry() {
    let (manager, robots) = manager();

    let req = CreateRobot {
        access: vec![AccessRequest::new("pull", "/project/1", "")],
        ..create_request("ci")
    };
    assert!(matches!(
        manager.create(&admin(), "library", req),
        Err(Error::InvalidResource(path)) if path == "/project/1"
    ));

    let req = CreateRobot {
        expires_at: Some(Utc::now() - Duration::hours(1)),
        ..create_request("ci")
    };
    assert!(matches!(
        manager.create(&admin(), "library", req),
        Err(Error::BadRequest(_))
    ));
    assert_eq!(robots.writes(), 0);
}

#[test]
fn test_unknown_project() {
    let (manager, _) = manager();
    assert!(matches!(
        manager.get(&admin(), "nowhere", 1),
        Err(Error::ProjectNotFound(name)) if name == "nowhere"
    ));
}

#[test]
fn test_cross_project_access_is_not_found() {
    let (manager, robots) = manager();
    let robot = create(&manager, "ci");

    assert!(matches!(
        manager.get(&admin(), "other", robot.id),
        Err(Error::RobotNotFound { project_id: OTHER, robot_id }) if robot_id == robot.id
    ));

    let update = UpdateRobot {
        disabled: true,
        description: String::new(),
    };
    assert!(matches!(
        manager.update(&admin(), "other", robot.id, update),
        Err(Error::RobotNotFound { .. })
    ));

    assert!(matches!(
        manager.delete(&admin(), "other", robot.id),
        Err(Error::RobotNotFound { .. })
    ));

    // Nothing beyond the initial create was written
    assert_eq!(robots.writes(), 1);
    assert_eq!(robots.len(), 1);
}

#[test]
fn test_update_writes_only_on_change() {
    let (manager, robots) = manager();
    let robot = create(&manager, "ci");
    let req = UpdateRobot {
        disabled: true,
        description: "paused".to_string(),
    };

    manager
        .update(&admin(), "library", robot.id, req.clone())
        .unwrap();
    assert_eq!(robots.writes(), 2);

    manager.update(&admin(), "library", robot.id, req).unwrap();
    assert_eq!(robots.writes(), 2);

    let fetched = manager.get(&admin(), "library", robot.id).unwrap();
    assert!(fetched.disabled);
    assert_eq!(fetched.description, "paused");
}

#[test]
fn test_update_disable_only_leaves_description() {
    let (manager, robots) = manager();
    let robot = create(&manager, "ci");

    let req = UpdateRobot {
        disabled: true,
        description: robot.description.clone(),
    };
    manager.update(&admin(), "library", robot.id, req).unwrap();
    assert_eq!(robots.writes(), 2);
    assert_eq!(
        robots.last_update.lock().unwrap().clone(),
        Some(RobotChanges {
            disabled: Some(true),
            description: None,
        })
    );

    let fetched = manager.get(&admin(), "library", robot.id).unwrap();
    assert!(fetched.disabled);
    assert_eq!(fetched.description, "ci pipeline");
}

#[test]
fn test_update_unchanged_robot_skips_write() {
    let (manager, robots) = manager();
    let robot = create(&manager, "ci");

    let req = UpdateRobot {
        disabled: robot.disabled,
        description: robot.description.clone(),
    };
    manager.update(&admin(), "library", robot.id, req).unwrap();
    assert_eq!(robots.writes(), 1);
}

#[test]
fn test_delete_missing_robot_succeeds() {
    let (manager, robots) = manager();
    manager.delete(&admin(), "library", 404).unwrap();
    assert_eq!(robots.writes(), 0);
}

#[test]
fn test_delete_twice() {
    let (manager, robots) = manager();
    let robot = create(&manager, "ci");

    manager.delete(&admin(), "library", robot.id).unwrap();
    manager.delete(&admin(), "library", robot.id).unwrap();
    assert_eq!(robots.len(), 0);
    assert!(matches!(
        manager.get(&admin(), "library", robot.id),
        Err(Error::RobotNotFound { .. })
    ));
}

#[test]
fn test_delete_vanished_between_lookup_and_delete() {
    let (manager, robots) = manager();
    let robot = create(&manager, "ci");
    robots.vanish_on_delete.store(true, Ordering::SeqCst);

    manager.delete(&admin(), "library", robot.id).unwrap();
}

#[test]
fn test_delete_storage_failure_propagates() {
    let (manager, robots) = manager();
    let robot = create(&manager, "ci");
    robots.fail_delete.store(true, Ordering::SeqCst);

    assert!(matches!(
        manager.delete(&admin(), "library", robot.id),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_list_pages_and_counts() {
    let (manager, _) = manager();
    for i in 0..25 {
        create(&manager, &format!("robot-{i:02}"));
    }

    let query = ListQuery::new(None, Some(1), Some(10)).unwrap();
    let page = manager.list(&admin(), "library", &query).unwrap();
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total_count, 25);
    assert_eq!(page.items[0].name, "robot-00");

    let query = ListQuery::new(None, Some(3), Some(10)).unwrap();
    let page = manager.list(&admin(), "library", &query).unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total_count, 25);

    let query = ListQuery::new(Some("name=~robot-2".to_string()), None, None).unwrap();
    let page = manager.list(&admin(), "library", &query).unwrap();
    assert_eq!(page.total_count, 5);

    // Robots in other projects never leak into the listing
    let other = manager
        .list(&admin(), "other", &ListQuery::default())
        .unwrap();
    assert_eq!(other.total_count, 0);
}

#[test]
fn test_forbidden_before_any_storage_access() {
    let (manager, robots) = manager_with(Arc::new(DenyAll));

    assert!(matches!(
        manager.create(&admin(), "library", create_request("ci")),
        Err(Error::Forbidden)
    ));
    assert!(matches!(
        manager.delete(&admin(), "library", 1),
        Err(Error::Forbidden)
    ));
    assert!(matches!(
        manager.list(&admin(), "library", &ListQuery::default()),
        Err(Error::Forbidden)
    ));
    assert_eq!(robots.writes(), 0);
}

#[test]
fn test_cancelled_context() {
    let (manager, robots) = manager();
    let ctx = admin();
    ctx.cancellation().cancel();

    assert!(matches!(
        manager.create(&ctx, "library", create_request("ci")),
        Err(Error::Cancelled)
    ));
    assert!(matches!(
        manager.delete(&ctx, "library", 1),
        Err(Error::Cancelled)
    ));
    assert_eq!(robots.writes(), 0);
}

#[test]
fn test_grant_gate_against_store() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
    store.initialize().unwrap();

    let project = store.create_project("library").unwrap();
    let now = Utc::now();
    store
        .create_user(&User {
            id: "user-1".to_string(),
            name: "alice".to_string(),
            created_at: now,
            updated_at: now,
        })
        .unwrap();
    store
        .upsert_project_grant(&ProjectGrant {
            user_id: "user-1".to_string(),
            project_id: project.id,
            allow_bits: Permission::ROBOT_UPDATE,
            deny_bits: Permission::ROBOT_LIST,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

    let gate = GrantGate::new(store.clone());
    let scope = ProjectScope::from(&project);
    let alice = Caller::User {
        user_id: "user-1".to_string(),
        token_id: "tok-1".to_string(),
    };
    let bob = Caller::User {
        user_id: "user-2".to_string(),
        token_id: "tok-2".to_string(),
    };
    let admin = Caller::Admin {
        token_id: "tok-admin".to_string(),
    };

    // update implies read; list is explicitly denied
    gate.require_access(&alice, &scope, RobotAction::Update)
        .unwrap();
    gate.require_access(&alice, &scope, RobotAction::Read).unwrap();
    assert!(matches!(
        gate.require_access(&alice, &scope, RobotAction::List),
        Err(Error::Forbidden)
    ));
    assert!(matches!(
        gate.require_access(&alice, &scope, RobotAction::Delete),
        Err(Error::Forbidden)
    ));
    assert!(matches!(
        gate.require_access(&bob, &scope, RobotAction::Read),
        Err(Error::Forbidden)
    ));
    gate.require_access(&admin, &scope, RobotAction::Delete)
        .unwrap();
}

#[test]
fn test_manager_over_sqlite() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
    store.initialize().unwrap();
    let project = store.create_project("library").unwrap();

    let manager = RobotManager::new(
        store.clone(),
        Arc::new(StaticCatalog::builtin()),
        store.clone(),
        Arc::new(GrantGate::new(store.clone())),
    );

    let req = CreateRobot {
        access: vec![pull_request(project.id)],
        ..create_request("ci")
    };
    let created = manager.create(&admin(), "library", req.clone()).unwrap();
    assert!(matches!(
        manager.create(&admin(), "library", req),
        Err(Error::AlreadyExists)
    ));

    let fetched = manager
        .get(&admin(), &project.id.to_string(), created.robot.id)
        .unwrap();
    assert_eq!(fetched.name, "ci");
    assert_eq!(fetched.permissions, created.robot.permissions);

    manager
        .delete(&admin(), "library", created.robot.id)
        .unwrap();
    manager
        .delete(&admin(), "library", created.robot.id)
        .unwrap();
}
