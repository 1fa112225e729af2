use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::validator::validate;
use super::{
    AccessGate, ListQuery, PolicyCatalog, ProjectResolver, RequestContext, RobotFilter,
    RobotStore,
};
use crate::auth::credential::{self, Shape};
use crate::error::{Error, Result};
use crate::types::{
    AccessRequest, NewRobot, ProjectScope, Robot, RobotAction, RobotChanges, RobotLevel,
    RobotPermission,
};
use crate::validation::{validate_description, validate_robot_name};

#[derive(Debug, Clone)]
pub struct CreateRobot {
    pub name: String,
    pub description: String,
    /// `None` means the robot never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub access: Vec<AccessRequest>,
}

/// A freshly created robot together with its plaintext secret. This is the
/// only place the secret is ever available.
#[derive(Debug, Clone)]
pub struct CreatedRobot {
    pub robot: Robot,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRobot {
    pub disabled: bool,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct RobotList {
    pub items: Vec<Robot>,
    /// Size of the full filtered set, independent of the page window.
    pub total_count: i64,
}

pub struct RobotManager {
    projects: Arc<dyn ProjectResolver>,
    catalog: Arc<dyn PolicyCatalog>,
    robots: Arc<dyn RobotStore>,
    gate: Arc<dyn AccessGate>,
}

impl RobotManager {
    pub fn new(
        projects: Arc<dyn ProjectResolver>,
        catalog: Arc<dyn PolicyCatalog>,
        robots: Arc<dyn RobotStore>,
        gate: Arc<dyn AccessGate>,
    ) -> Self {
        Self {
            projects,
            catalog,
            robots,
            gate,
        }
    }

    pub fn create(
        &self,
        ctx: &RequestContext,
        project: &str,
        req: CreateRobot,
    ) -> Result<CreatedRobot> {
        let scope = self.authorize(ctx, project, RobotAction::Create)?;

        validate_robot_name(&req.name).map_err(Error::BadRequest)?;
        validate_description(&req.description).map_err(Error::BadRequest)?;
        let now = Utc::now();
        if req.expires_at.is_some_and(|at| at <= now) {
            return Err(Error::BadRequest(
                "expires_at must be in the future".to_string(),
            ));
        }

        ctx.ensure_active()?;
        let access = validate(&scope, &req.access, self.catalog.as_ref())?;

        let secret = credential::issue(Shape::RobotSecret)?;
        let new_robot = NewRobot {
            project_id: scope.project_id,
            name: req.name,
            description: req.description,
            secret_hash: secret.hash,
            expires_at: req.expires_at,
            level: RobotLevel::Project,
            permissions: vec![RobotPermission::project(&scope.project_name, access)],
            creation_time: now,
        };

        ctx.ensure_active()?;
        let robot = self.robots.create_robot(&new_robot)?;

        tracing::info!(
            "Created robot {} ({}) in project {}",
            robot.name,
            robot.id,
            scope.project_name
        );

        Ok(CreatedRobot {
            robot,
            secret: secret.raw,
        })
    }

    pub fn get(&self, ctx: &RequestContext, project: &str, robot_id: i64) -> Result<Robot> {
        let scope = self.authorize(ctx, project, RobotAction::Read)?;
        self.lookup(ctx, &scope, robot_id)
    }

    pub fn list(&self, ctx: &RequestContext, project: &str, query: &ListQuery) -> Result<RobotList> {
        let scope = self.authorize(ctx, project, RobotAction::List)?;
        let filter = query.filter(scope.project_id)?;

        ctx.ensure_active()?;
        let total_count = self.robots.count_robots(&filter)?;

        ctx.ensure_active()?;
        let items = self.robots.list_robots(&filter, Some(&query.page))?;

        Ok(RobotList { items, total_count })
    }

    /// Updates `disabled` and `description`, writing only what changed.
    pub fn update(
        &self,
        ctx: &RequestContext,
        project: &str,
        robot_id: i64,
        req: UpdateRobot,
    ) -> Result<()> {
        let scope = self.authorize(ctx, project, RobotAction::Update)?;
        validate_description(&req.description).map_err(Error::BadRequest)?;

        let robot = self.lookup(ctx, &scope, robot_id)?;
        let changes = RobotChanges::diff(&robot, req.disabled, &req.description);
        if changes.is_empty() {
            tracing::debug!("Robot {} unchanged, skipping write", robot_id);
            return Ok(());
        }

        ctx.ensure_active()?;
        self.robots
            .update_robot(scope.project_id, robot_id, &changes)
    }

    /// Deletes a robot. Deleting a robot that does not exist anywhere succeeds.
    pub fn delete(&self, ctx: &RequestContext, project: &str, robot_id: i64) -> Result<()> {
        let scope = self.authorize(ctx, project, RobotAction::Delete)?;

        match self.lookup(ctx, &scope, robot_id) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                ctx.ensure_active()?;
                if self.robots.robot_exists(robot_id)? {
                    return Err(e);
                }
                tracing::debug!("Robot {} already absent", robot_id);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        ctx.ensure_active()?;
        match self.robots.delete_robot(scope.project_id, robot_id) {
            Ok(()) => {
                tracing::info!(
                    "Deleted robot {} from project {}",
                    robot_id,
                    scope.project_name
                );
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn authorize(
        &self,
        ctx: &RequestContext,
        project: &str,
        action: RobotAction,
    ) -> Result<ProjectScope> {
        ctx.ensure_active()?;
        let scope = self.projects.resolve(project)?;

        ctx.ensure_active()?;
        self.gate.require_access(ctx.caller(), &scope, action)?;

        Ok(scope)
    }

    fn lookup(&self, ctx: &RequestContext, scope: &ProjectScope, robot_id: i64) -> Result<Robot> {
        ctx.ensure_active()?;
        self.robots
            .list_robots(&RobotFilter::by_id(scope.project_id, robot_id), None)?
            .into_iter()
            .next()
            .ok_or(Error::RobotNotFound {
                project_id: scope.project_id,
                robot_id,
            })
    }
}
