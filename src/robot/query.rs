use crate::error::{Error, Result};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// A 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub size: u64,
}

impl Page {
    pub fn new(number: Option<u64>, size: Option<u64>) -> Result<Self> {
        let number = number.unwrap_or(DEFAULT_PAGE);
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);

        if number == 0 {
            return Err(Error::BadRequest("page must be greater than 0".to_string()));
        }
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(Error::BadRequest(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        Ok(Self { number, size })
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: DEFAULT_PAGE,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    Exact(String),
    /// Substring match.
    Fuzzy(String),
}

/// Storage-level robot filter. Always bound to a single project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotFilter {
    pub project_id: i64,
    pub id: Option<i64>,
    pub name: Option<NameMatch>,
    pub disabled: Option<bool>,
}

impl RobotFilter {
    #[must_use]
    pub fn project(project_id: i64) -> Self {
        Self {
            project_id,
            id: None,
            name: None,
            disabled: None,
        }
    }

    #[must_use]
    pub fn by_id(project_id: i64, id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::project(project_id)
        }
    }
}

/// A list request: `q` filter string plus page window.
///
/// `q` is a comma-separated list of `key=value` (exact) or `key=~value`
/// (substring) terms. Supported keys are `name` and `disabled`.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Page,
}

impl ListQuery {
    pub fn new(q: Option<String>, page: Option<u64>, page_size: Option<u64>) -> Result<Self> {
        Ok(Self {
            q,
            page: Page::new(page, page_size)?,
        })
    }

    /// Builds the storage filter for `project_id`. Any project key in `q` is
    /// rejected; the project always comes from the resolved scope.
    pub fn filter(&self, project_id: i64) -> Result<RobotFilter> {
        let mut filter = RobotFilter::project(project_id);

        let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return Ok(filter);
        };

        for term in q.split(',') {
            let (key, value) = term
                .split_once('=')
                .ok_or_else(|| Error::BadRequest(format!("invalid query term: {term}")))?;
            let key = key.trim();
            let (fuzzy, value) = match value.strip_prefix('~') {
                Some(v) => (true, v.trim()),
                None => (false, value.trim()),
            };

            match key {
                "name" => {
                    filter.name = Some(if fuzzy {
                        NameMatch::Fuzzy(value.to_string())
                    } else {
                        NameMatch::Exact(value.to_string())
                    });
                }
                "disabled" if !fuzzy => {
                    let disabled = value.parse::<bool>().map_err(|_| {
                        Error::BadRequest(format!("invalid value for disabled: {value}"))
                    })?;
                    filter.disabled = Some(disabled);
                }
                _ => {
                    return Err(Error::BadRequest(format!(
                        "unsupported query key: {key}"
                    )));
                }
            }
        }

        Ok(filter)
    }
}
