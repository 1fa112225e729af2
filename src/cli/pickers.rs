use std::fmt;

use inquire::Select;

use crate::robot::parse_project_id;
use crate::store::{SqliteStore, Store};
use crate::types::{Project, User};

struct ProjectOption(Project);

impl fmt::Display for ProjectOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id {})", self.0.name, self.0.id)
    }
}

struct UserOption(User);

impl fmt::Display for UserOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.name, self.0.id)
    }
}

/// Looks a project up by id or name.
pub fn find_project(store: &SqliteStore, project: &str) -> anyhow::Result<Project> {
    let found = match parse_project_id(project) {
        Some(id) => store.get_project(id)?,
        None => store.get_project_by_name(project)?,
    };
    found.ok_or_else(|| anyhow::anyhow!("Project not found: {}", project))
}

/// Looks a user up by name first, then by id.
pub fn find_user(store: &SqliteStore, user: &str) -> anyhow::Result<User> {
    if let Some(found) = store.get_user_by_name(user)? {
        return Ok(found);
    }
    store
        .get_user(user)?
        .ok_or_else(|| anyhow::anyhow!("User not found: {}", user))
}

pub fn pick_project(store: &SqliteStore) -> anyhow::Result<Option<Project>> {
    let projects = store.list_projects()?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(None);
    }

    let options: Vec<ProjectOption> = projects.into_iter().map(ProjectOption).collect();
    let selected = Select::new("Select project:", options).prompt()?;
    Ok(Some(selected.0))
}

pub fn pick_user(store: &SqliteStore) -> anyhow::Result<Option<User>> {
    let users = store.list_users("", 1000)?;
    if users.is_empty() {
        println!("No users found.");
        return Ok(None);
    }

    let options: Vec<UserOption> = users.into_iter().map(UserOption).collect();
    let selected = Select::new("Select user:", options).prompt()?;
    Ok(Some(selected.0))
}

/// Resolves an explicit `--project` or falls back to a picker.
pub fn get_or_pick_project(
    store: &SqliteStore,
    project: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<Option<Project>> {
    match project {
        Some(p) => find_project(store, &p).map(Some),
        None if non_interactive => {
            anyhow::bail!("--project is required in non-interactive mode")
        }
        None => pick_project(store),
    }
}

/// Resolves an explicit `--user` or falls back to a picker.
pub fn get_or_pick_user(
    store: &SqliteStore,
    user: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<Option<User>> {
    match user {
        Some(u) => find_user(store, &u).map(Some),
        None if non_interactive => anyhow::bail!("--user is required in non-interactive mode"),
        None => pick_user(store),
    }
}

pub fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}
