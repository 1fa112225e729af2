mod admin;
mod commands;
pub mod http_client;
pub mod pickers;
mod robot;

pub use admin::{
    run_grant, run_init, run_project_add, run_project_list, run_project_remove, run_revoke,
    run_token_create, run_user_add, run_user_list,
};
pub use commands::{AdminCommands, ProjectCommands, RobotCommands, TokenCommands, UserCommands};
pub use robot::{
    parse_access, run_robot_create, run_robot_delete, run_robot_get, run_robot_list,
    run_robot_update,
};

use chrono::{DateTime, Utc};

use crate::auth::expiry_after;
use crate::store::SqliteStore;

pub const DB_FILE: &str = "robokey.db";

const SECONDS_PER_DAY: i64 = 86_400;

/// Turns `--expires-days` into an absolute expiry.
fn expiry_from_days(days: i64) -> anyhow::Result<DateTime<Utc>> {
    if days <= 0 {
        anyhow::bail!("--expires-days must be positive");
    }
    days.checked_mul(SECONDS_PER_DAY)
        .and_then(|seconds| expiry_after(Utc::now(), seconds))
        .ok_or_else(|| anyhow::anyhow!("--expires-days {days} is out of range"))
}

/// Opens the store in `data_dir`, failing if `admin init` has not run.
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join(DB_FILE);

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'robokey admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_from_days() {
        let at = expiry_from_days(30).unwrap();
        assert!(at > Utc::now() + chrono::TimeDelta::days(29));

        assert!(expiry_from_days(0).is_err());
        assert!(expiry_from_days(-1).is_err());

        let err = expiry_from_days(1_000_000_000).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(expiry_from_days(i64::MAX).is_err());
    }
}
