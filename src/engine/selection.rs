//! Which checks a run executes
//!
//! Precedence: an explicit single name, then `only`, then `skip`, then every
//! enabled check. The result is always in registry order.

use super::check::Check;
use super::error::EngineError;
use super::registry::CheckRegistry;
use std::collections::HashSet;

pub fn resolve<'r>(
    registry: &'r CheckRegistry,
    check: Option<&str>,
    only: &[String],
    skip: &[String],
) -> Result<Vec<&'r Check>, EngineError> {
    let unknown = |name: &str| EngineError::UnknownCheck {
        name: name.to_string(),
        available: registry.names(),
    };

    if let Some(name) = check.map(str::trim).filter(|n| !n.is_empty()) {
        // An explicit request runs the check even when it is disabled
        let selected = registry.get(name).ok_or_else(|| unknown(name))?;
        return Ok(vec![selected]);
    }

    if let Some(missing) = only
        .iter()
        .map(|n| n.trim())
        .find(|n| !n.is_empty() && !registry.contains(n))
    {
        return Err(unknown(missing));
    }

    let only = normalize(only);
    let selected: Vec<&Check> = if !only.is_empty() {
        registry
            .iter()
            .filter(|c| c.enabled && only.contains(c.name.as_str()))
            .collect()
    } else {
        let skip = normalize(skip);
        for name in skip.iter().filter(|n| !registry.contains(n)) {
            tracing::warn!("Ignoring unknown check '{}' in skip list", name);
        }
        registry
            .iter()
            .filter(|c| c.enabled && !skip.contains(c.name.as_str()))
            .collect()
    };

    if selected.is_empty() {
        return Err(EngineError::NoChecksSelected);
    }
    Ok(selected)
}

fn normalize(names: &[String]) -> HashSet<&str> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect()
}
