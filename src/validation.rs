const MAX_PROJECT_NAME_LEN: usize = 64;
const MAX_USER_NAME_LEN: usize = 64;
const MAX_ROBOT_NAME_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 1024;

fn is_valid_name_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_name(
    name: &str,
    entity: &str,
    max_len: usize,
    allow_period: bool,
    forbid_leading_special: bool,
) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if name.len() > max_len {
        return Err(format!("{entity} name cannot exceed {max_len} characters"));
    }
    if !name.chars().all(|c| is_valid_name_char(c, allow_period)) {
        let mut allowed = "alphanumeric characters, hyphens, and underscores".to_string();
        if allow_period {
            allowed.push_str(", and periods");
        }
        return Err(format!("{entity} name can only contain {allowed}"));
    }
    if forbid_leading_special && (name.starts_with('-') || name.starts_with('_')) {
        return Err(format!(
            "{entity} name cannot start with a hyphen or underscore"
        ));
    }
    Ok(())
}

/// Project names must not be all digits, or they would be read back as ids.
pub fn validate_project_name(name: &str) -> Result<(), String> {
    validate_name(name, "Project", MAX_PROJECT_NAME_LEN, true, true)?;
    if name.chars().all(|c| c.is_ascii_digit()) {
        return Err("Project name cannot be numeric".to_string());
    }
    Ok(())
}

pub fn validate_user_name(name: &str) -> Result<(), String> {
    validate_name(name, "User", MAX_USER_NAME_LEN, true, true)
}

pub fn validate_robot_name(name: &str) -> Result<(), String> {
    validate_name(name, "Robot", MAX_ROBOT_NAME_LEN, true, true)
}

pub fn validate_description(description: &str) -> Result<(), String> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robot_name_rules() {
        assert!(validate_robot_name("ci-builder.v2").is_ok());
        assert!(validate_robot_name("").is_err());
        assert!(validate_robot_name("-ci").is_err());
        assert!(validate_robot_name("ci builder").is_err());
        assert!(validate_robot_name(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_numeric_project_name_rejected() {
        assert!(validate_project_name("library").is_ok());
        assert!(validate_project_name("1234").is_err());
        assert!(validate_project_name("v1").is_ok());
    }
}
