use crate::robot::parse_project_id;
use crate::server::dto::{
    CreateRobotRequest, CreatedRobotResponse, RobotResponse, UpdateRobotRequest,
};
use crate::types::AccessRequest;

use super::expiry_from_days;
use super::http_client::ApiClient;
use super::pickers::confirm_action;

fn robots_path(project: &str) -> String {
    format!("/projects/{project}/robots")
}

/// Parses `resource:action[:effect]`. Short resource names are expanded
/// to `/project/<id>/<resource>`, which needs a numeric project.
pub fn parse_access(project: &str, access: &str) -> anyhow::Result<AccessRequest> {
    let (head, effect) = match access.rsplit_once(':') {
        Some((head, last)) if last == "allow" || last == "deny" => (head, last),
        _ => (access, ""),
    };

    let Some((resource, action)) = head.rsplit_once(':') else {
        anyhow::bail!("Invalid access '{}': expected resource:action[:effect]", access);
    };
    if resource.is_empty() || action.is_empty() {
        anyhow::bail!("Invalid access '{}': expected resource:action[:effect]", access);
    }

    let resource = if resource.starts_with('/') {
        resource.to_string()
    } else if let Some(id) = parse_project_id(project) {
        format!("/project/{id}/{resource}")
    } else {
        anyhow::bail!(
            "Access '{}' needs a numeric --project or a full resource path",
            access
        );
    };

    Ok(AccessRequest::new(action, resource, effect))
}

fn print_robot(robot: &RobotResponse) {
    println!();
    println!("  ID:          {}", robot.id);
    println!("  Name:        {}", robot.name);
    println!("  Project:     {}", robot.project_id);
    if !robot.description.is_empty() {
        println!("  Description: {}", robot.description);
    }
    println!("  Level:       {}", robot.level);
    println!("  Disabled:    {}", robot.disable);
    match robot.expires_at {
        Some(at) => println!("  Expires:     {}", at.to_rfc3339()),
        None => println!("  Expires:     never"),
    }
    for permission in &robot.permissions {
        for policy in &permission.access {
            println!("  Access:      {} ({})", policy, permission.namespace);
        }
    }
    println!();
}

pub fn run_robot_create(
    client: &ApiClient,
    project: String,
    name: String,
    description: String,
    access: Vec<String>,
    expires_days: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let access = access
        .iter()
        .map(|access| parse_access(&project, access))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let request = CreateRobotRequest {
        name,
        description,
        expires_at: expires_days.map(expiry_from_days).transpose()?,
        access,
    };

    let created: CreatedRobotResponse = client.post(&robots_path(&project), &request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
        return Ok(());
    }

    println!();
    println!("Created robot '{}' (id {})", created.name, created.id);
    println!();
    println!("========================================");
    println!("Secret (save this, it won't be shown again):");
    println!();
    println!("  {}", created.secret);
    println!();
    println!("========================================");
    println!();

    Ok(())
}

pub fn run_robot_list(
    client: &ApiClient,
    project: String,
    q: Option<String>,
    page: Option<u64>,
    page_size: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let mut query = Vec::new();
    if let Some(q) = q {
        query.push(("q", q));
    }
    if let Some(page) = page {
        query.push(("page", page.to_string()));
    }
    if let Some(page_size) = page_size {
        query.push(("page_size", page_size.to_string()));
    }

    let (robots, total): (Vec<RobotResponse>, i64) =
        client.get_counted(&robots_path(&project), &query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&robots)?);
        return Ok(());
    }

    if robots.is_empty() {
        println!("No robots found.");
        return Ok(());
    }

    println!();
    for robot in &robots {
        let state = if robot.disable { "disabled" } else { "enabled" };
        println!("  {:>6}  {:<32} {}", robot.id, robot.name, state);
    }
    println!();
    println!("  Showing {} of {} robots", robots.len(), total);
    println!();

    Ok(())
}

pub fn run_robot_get(
    client: &ApiClient,
    project: String,
    id: i64,
    json: bool,
) -> anyhow::Result<()> {
    let robot: RobotResponse = client.get(&format!("{}/{id}", robots_path(&project)))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&robot)?);
    } else {
        print_robot(&robot);
    }

    Ok(())
}

pub fn run_robot_update(
    client: &ApiClient,
    project: String,
    id: i64,
    disable: bool,
    description: String,
) -> anyhow::Result<()> {
    let request = UpdateRobotRequest {
        disable,
        description,
    };
    client.put(&format!("{}/{id}", robots_path(&project)), &request)?;

    println!();
    println!(
        "Robot {} is now {}",
        id,
        if disable { "disabled" } else { "enabled" }
    );
    println!();

    Ok(())
}

pub fn run_robot_delete(
    client: &ApiClient,
    project: String,
    id: i64,
    yes: bool,
) -> anyhow::Result<()> {
    let confirmed = confirm_action(
        &format!("Delete robot {id} from project '{project}'?"),
        yes,
        false,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    client.delete(&format!("{}/{id}", robots_path(&project)))?;

    println!();
    println!("Deleted robot {id}");
    println!();

    Ok(())
}
