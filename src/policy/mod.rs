/*!
 * Policy Module
 * Static policy snapshot for the audited subject type
 *
 * Rules are extracted once at audit start from the external `sesearch`
 * collaborator and held immutable for the whole session.
 */

mod rule;
mod sesearch;

pub use rule::{PolicyRule, PolicySnapshot, RuleKey};
pub use sesearch::{extract_rules, parse_rule, PolicyError};
