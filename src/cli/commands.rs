use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage access tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Grant robot-management permissions to a user on a project
    Grant {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// User name or ID
        #[arg(long)]
        user: Option<String>,

        /// Project name or ID
        #[arg(long)]
        project: Option<String>,

        /// Permissions to grant (comma-separated: robot:list,robot:read,robot:create,robot:update,robot:delete,robot:admin)
        #[arg(long)]
        permissions: Option<String>,

        /// Permissions to deny (same format as --permissions)
        #[arg(long)]
        deny: Option<String>,

        /// Skip interactive prompts (requires --user, --project, --permissions)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Revoke a user's permissions on a project
    Revoke {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// User name or ID
        #[arg(long)]
        user: Option<String>,

        /// Project name or ID
        #[arg(long)]
        project: Option<String>,

        /// Skip interactive prompts (requires --user, --project)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Add a new project
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Name for the new project
        #[arg(long)]
        name: Option<String>,

        /// Skip interactive prompts (requires --name)
        #[arg(long)]
        non_interactive: bool,
    },

    /// List projects
    List {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a project along with its robots and grants
    Remove {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Project name or ID
        #[arg(long)]
        project: Option<String>,

        /// Skip interactive prompts (requires --project)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user and optionally a token
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Username for the new user
        #[arg(long)]
        username: Option<String>,

        /// Create a token for the new user
        #[arg(long)]
        create_token: bool,

        /// Skip interactive prompts (requires --username)
        #[arg(long)]
        non_interactive: bool,
    },

    /// List users
    List {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Create a new access token for a user
    Create {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// User name or ID for the token
        #[arg(long)]
        user: Option<String>,

        /// Token expiration in days (omit for no expiration)
        #[arg(long)]
        expires_days: Option<i64>,

        /// Skip interactive prompts (requires --user)
        #[arg(long)]
        non_interactive: bool,
    },
}

#[derive(Subcommand)]
pub enum RobotCommands {
    /// Create a robot account
    Create {
        /// Project name or ID
        #[arg(long)]
        project: String,

        /// Robot name
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Grant as resource:action[:effect], e.g. repository:pull. Repeatable.
        /// A full resource path (/project/1/repository:pull) is also accepted.
        #[arg(long = "access", required = true)]
        access: Vec<String>,

        /// Expiration in days (omit for no expiration)
        #[arg(long)]
        expires_days: Option<i64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List robot accounts in a project
    List {
        /// Project name or ID
        #[arg(long)]
        project: String,

        /// Filter, e.g. name=~ci or disabled=true
        #[arg(long)]
        q: Option<String>,

        #[arg(long)]
        page: Option<u64>,

        #[arg(long)]
        page_size: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a robot account
    Get {
        /// Project name or ID
        #[arg(long)]
        project: String,

        /// Robot ID
        #[arg(long)]
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enable, disable, or re-describe a robot account
    Update {
        /// Project name or ID
        #[arg(long)]
        project: String,

        /// Robot ID
        #[arg(long)]
        id: i64,

        /// Disable the robot (omit to enable)
        #[arg(long)]
        disable: bool,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Delete a robot account
    Delete {
        /// Project name or ID
        #[arg(long)]
        project: String,

        /// Robot ID
        #[arg(long)]
        id: i64,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
