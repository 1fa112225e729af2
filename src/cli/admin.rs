use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use inquire::Text;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::store_new_token;
use crate::store::{SqliteStore, Store};
use crate::types::{Permission, ProjectGrant, User};
use crate::validation::{validate_project_name, validate_user_name};

use super::pickers::{confirm_action, get_or_pick_project, get_or_pick_user};
use super::{expiry_from_days, init_store};

const ADMIN_TOKEN_FILE: &str = ".admin_token";

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

fn prompt_name(label: &str, validate: fn(&str) -> Result<(), String>) -> anyhow::Result<String> {
    Ok(Text::new(label)
        .with_validator(move |input: &str| {
            Ok(validate(input)
                .map(|()| inquire::validator::Validation::Valid)
                .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.into())))
        })
        .prompt()?)
}

fn print_token_banner(heading: &str, raw_token: &str) {
    println!();
    println!("========================================");
    println!("{heading}");
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();
}

pub fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path = PathBuf::from(data_dir);
    fs::create_dir_all(&data_path)?;

    let store = SqliteStore::new(data_path.join(super::DB_FILE))?;
    store.initialize()?;

    let token_file = data_path.join(ADMIN_TOKEN_FILE);

    if store.has_admin_token()? {
        anyhow::bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let (_, raw_token) = store_new_token(&store, None, None)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    print_token_banner(
        "Admin token (save this, it won't be shown again):",
        &raw_token,
    );
    println!("Token also written to: {}", token_file.display());
    println!();

    if !non_interactive {
        let create_project = inquire::Confirm::new("Would you like to create a first project?")
            .with_default(false)
            .prompt()?;
        if create_project {
            let name = prompt_name("Project name:", validate_project_name)?;
            let project = store.create_project(&name)?;
            println!("Created project \"{}\" (id {})", project.name, project.id);
        }
    }

    Ok(())
}

// Projects

#[derive(Serialize)]
struct ProjectOutput {
    id: i64,
    name: String,
    created_at: String,
}

pub fn run_project_add(
    data_dir: String,
    name: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let name = if let Some(n) = name {
        validate_project_name(&n).map_err(anyhow::Error::msg)?;
        n
    } else if non_interactive {
        anyhow::bail!("--name is required in non-interactive mode");
    } else {
        prompt_name("Project name:", validate_project_name)?
    };

    if store.get_project_by_name(&name)?.is_some() {
        anyhow::bail!("Project '{}' already exists", name);
    }

    let project = store.create_project(&name)?;

    println!();
    println!("Created project \"{}\" (id {})", project.name, project.id);
    println!();

    Ok(())
}

pub fn run_project_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let projects = store.list_projects()?;

    if json {
        let output: Vec<ProjectOutput> = projects
            .into_iter()
            .map(|p| ProjectOutput {
                id: p.id,
                name: p.name,
                created_at: p.created_at.to_rfc3339(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    println!();
    for project in projects {
        println!("  {:>6}  {}", project.id, project.name);
    }
    println!();

    Ok(())
}

pub fn run_project_remove(
    data_dir: String,
    project: Option<String>,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let Some(project) = get_or_pick_project(&store, project, non_interactive)? else {
        return Ok(());
    };

    let confirmed = confirm_action(
        &format!(
            "Delete project '{}' and all of its robots?",
            project.name
        ),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    store.delete_project(project.id)?;

    println!();
    println!("Deleted project '{}'", project.name);
    println!();

    Ok(())
}

// Users

#[derive(Serialize)]
struct UserOutput {
    id: String,
    name: String,
    created_at: String,
}

pub fn run_user_add(
    data_dir: String,
    username: Option<String>,
    create_token: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let username = if let Some(u) = username {
        validate_user_name(&u).map_err(anyhow::Error::msg)?;
        u
    } else if non_interactive {
        anyhow::bail!("--username is required in non-interactive mode");
    } else {
        prompt_name("Username:", validate_user_name)?
    };

    if store.get_user_by_name(&username)?.is_some() {
        anyhow::bail!("User '{}' already exists", username);
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: username.clone(),
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    println!();
    println!("Created user '{}' ({})", username, user.id);

    if create_token {
        let (_, raw_token) = store_new_token(&store, Some(&user.id), None)?;
        print_token_banner(&format!("Token for '{username}':"), &raw_token);
    } else {
        println!();
    }

    Ok(())
}

pub fn run_user_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let users = store.list_users("", i32::MAX)?;

    if json {
        let output: Vec<UserOutput> = users
            .into_iter()
            .map(|u| UserOutput {
                id: u.id,
                name: u.name,
                created_at: u.created_at.to_rfc3339(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }
    println!();
    for user in users {
        println!("  {}  {}", user.id, user.name);
    }
    println!();

    Ok(())
}

// Tokens

pub fn run_token_create(
    data_dir: String,
    user: Option<String>,
    expires_days: Option<i64>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let Some(user) = get_or_pick_user(&store, user, non_interactive)? else {
        return Ok(());
    };

    let expires_at = expires_days.map(expiry_from_days).transpose()?;
    let (_, raw_token) = store_new_token(&store, Some(&user.id), expires_at)?;

    print_token_banner(&format!("Token for '{}':", user.name), &raw_token);

    Ok(())
}

// Grants

fn parse_permission_list(list: &str) -> anyhow::Result<Permission> {
    let parts: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    Permission::parse_many(&parts).ok_or_else(|| anyhow::anyhow!("Invalid permissions: {}", list))
}

pub fn run_grant(
    data_dir: String,
    user: Option<String>,
    project: Option<String>,
    permissions: Option<String>,
    deny: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let Some(user) = get_or_pick_user(&store, user, non_interactive)? else {
        return Ok(());
    };
    let Some(project) = get_or_pick_project(&store, project, non_interactive)? else {
        return Ok(());
    };

    let permissions = match permissions {
        Some(p) => p,
        None if non_interactive => {
            anyhow::bail!("--permissions is required in non-interactive mode")
        }
        None => Text::new("Permissions (comma-separated):")
            .with_default("robot:read")
            .prompt()?,
    };

    let allow_bits = parse_permission_list(&permissions)?;
    let deny_bits = match deny {
        Some(d) => parse_permission_list(&d)?,
        None => Permission::default(),
    };

    let now = Utc::now();
    let grant = ProjectGrant {
        user_id: user.id.clone(),
        project_id: project.id,
        allow_bits,
        deny_bits,
        created_at: now,
        updated_at: now,
    };
    store.upsert_project_grant(&grant)?;

    println!();
    println!(
        "Granted [{}] on project '{}' to '{}'",
        allow_bits, project.name, user.name
    );
    println!();

    Ok(())
}

pub fn run_revoke(
    data_dir: String,
    user: Option<String>,
    project: Option<String>,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let Some(user) = get_or_pick_user(&store, user, non_interactive)? else {
        return Ok(());
    };
    let Some(project) = get_or_pick_project(&store, project, non_interactive)? else {
        return Ok(());
    };

    let confirmed = confirm_action(
        &format!(
            "Revoke all permissions of '{}' on project '{}'?",
            user.name, project.name
        ),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    if !store.delete_project_grant(&user.id, project.id)? {
        anyhow::bail!(
            "User '{}' has no grant on project '{}'",
            user.name,
            project.name
        );
    }

    println!();
    println!("Revoked permissions of '{}' on project '{}'", user.name, project.name);
    println!();

    Ok(())
}
