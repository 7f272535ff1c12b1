use super::check::Check;

#[derive(Debug, thiserror::Error)]
#[error("check '{0}' is already registered")]
pub struct DuplicateCheck(pub String);

/// Ordered set of checks. Registration order is the order results are reported in.
#[derive(Debug, Clone, Default)]
pub struct CheckRegistry {
    checks: Vec<Check>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Check) -> Result<(), DuplicateCheck> {
        if self.contains(&check.name) {
            return Err(DuplicateCheck(check.name));
        }
        tracing::debug!("Registered {} check '{}'", check.strategy.kind(), check.name);
        self.checks.push(check);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.checks.iter().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
