use crate::util::{Result, SchemaError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    References,
    Trigger,
    Execute,
    Usage,
    Create,
    Connect,
    Temporary,
    Maintain,
    Set,
    AlterSystem,
}

impl Privilege {
    fn from_acl_char(c: char) -> Option<Self> {
        let privilege = match c {
            'r' => Privilege::Select,
            'a' => Privilege::Insert,
            'w' => Privilege::Update,
            'd' => Privilege::Delete,
            'D' => Privilege::Truncate,
            'x' => Privilege::References,
            't' => Privilege::Trigger,
            'X' => Privilege::Execute,
            'U' => Privilege::Usage,
            'C' => Privilege::Create,
            'c' => Privilege::Connect,
            'T' => Privilege::Temporary,
            'm' => Privilege::Maintain,
            's' => Privilege::Set,
            'A' => Privilege::AlterSystem,
            _ => return None,
        };
        Some(privilege)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::Select => "select",
            Privilege::Insert => "insert",
            Privilege::Update => "update",
            Privilege::Delete => "delete",
            Privilege::Truncate => "truncate",
            Privilege::References => "references",
            Privilege::Trigger => "trigger",
            Privilege::Execute => "execute",
            Privilege::Usage => "usage",
            Privilege::Create => "create",
            Privilege::Connect => "connect",
            Privilege::Temporary => "temporary",
            Privilege::Maintain => "maintain",
            Privilege::Set => "set",
            Privilege::AlterSystem => "alter system",
        }
    }
}

/// The kind of object a grant applies to; decides what `ALL` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeScope {
    Relation,
    Column,
    Sequence,
    Function,
    Schema,
    Language,
    Type,
    ForeignDataWrapper,
    ForeignServer,
}

impl PrivilegeScope {
    pub fn all_privileges(&self) -> &'static [Privilege] {
        use Privilege::*;
        match self {
            PrivilegeScope::Relation => &[Select, Insert, Update, Delete, Truncate, References, Trigger],
            PrivilegeScope::Column => &[Select, Insert, Update, References],
            PrivilegeScope::Sequence => &[Select, Update, Usage],
            PrivilegeScope::Function => &[Execute],
            PrivilegeScope::Schema => &[Usage, Create],
            PrivilegeScope::Language
            | PrivilegeScope::Type
            | PrivilegeScope::ForeignDataWrapper
            | PrivilegeScope::ForeignServer => &[Usage],
        }
    }

    /// Privileges that belong to `ALL` only on some server versions
    /// (`MAINTAIN` arrived in PostgreSQL 17). Folded into `all` when held.
    pub fn optional_privileges(&self) -> &'static [Privilege] {
        match self {
            PrivilegeScope::Relation => &[Privilege::Maintain],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Grant {
    /// Role name, or `PUBLIC`.
    pub grantee: String,
    pub privileges: BTreeSet<Privilege>,
    /// Subset of `privileges` held `WITH GRANT OPTION`.
    pub grantable: BTreeSet<Privilege>,
}

impl Grant {
    /// Privilege names for output, collapsing a complete set to `all`.
    /// Each entry carries whether it is grantable. The set collapses only
    /// when its members agree on the grant option.
    pub fn summarize(&self, scope: PrivilegeScope) -> Vec<(&'static str, bool)> {
        let collapsed: Vec<Privilege> = scope
            .all_privileges()
            .iter()
            .chain(scope.optional_privileges().iter().filter(|p| self.privileges.contains(*p)))
            .copied()
            .collect();

        let complete = scope.all_privileges().iter().all(|p| self.privileges.contains(p));
        let grantable = collapsed.iter().filter(|p| self.grantable.contains(*p)).count();
        let uniform = grantable == 0 || grantable == collapsed.len();

        let mut summary = Vec::new();
        if complete && uniform {
            summary.push(("all", grantable > 0));
        }
        for privilege in &self.privileges {
            if complete && uniform && collapsed.contains(privilege) {
                continue;
            }
            summary.push((privilege.as_str(), self.grantable.contains(privilege)));
        }
        summary
    }
}

/// Parses one `aclitem` in its text form, `grantee=privs/grantor`.
pub fn parse_aclitem(item: &str) -> Result<Grant> {
    let re = Regex::new(r#"^(?P<grantee>"(?:[^"]|"")*"|[^=]*)=(?P<privs>[A-Za-z*]*)/(?P<grantor>.+)$"#)
        .unwrap();
    let caps = re
        .captures(item)
        .ok_or_else(|| SchemaError::incomplete("access control list", format!("well-formed aclitem in '{item}'")))?;

    let grantee = unquote_role(&caps["grantee"]);
    let grantee = if grantee.is_empty() {
        "PUBLIC".to_string()
    } else {
        grantee
    };

    let mut privileges = BTreeSet::new();
    let mut grantable = BTreeSet::new();
    let mut last: Option<Privilege> = None;
    for c in caps["privs"].chars() {
        if c == '*' {
            if let Some(privilege) = last {
                grantable.insert(privilege);
            }
            continue;
        }
        match Privilege::from_acl_char(c) {
            Some(privilege) => {
                privileges.insert(privilege);
                last = Some(privilege);
            }
            None => {
                tracing::warn!(aclitem = item, privilege = %c, "skipping unrecognized privilege");
                last = None;
            }
        }
    }

    Ok(Grant {
        grantee,
        privileges,
        grantable,
    })
}

/// Parses a catalog ACL array. Items for the same grantee (from different
/// grantors) are merged; the result is sorted by grantee.
pub fn parse_acl(items: &[String]) -> Result<Vec<Grant>> {
    let mut by_grantee: BTreeMap<String, Grant> = BTreeMap::new();
    for item in items {
        let grant = parse_aclitem(item)?;
        match by_grantee.get_mut(&grant.grantee) {
            Some(existing) => {
                existing.privileges.extend(grant.privileges);
                existing.grantable.extend(grant.grantable);
            }
            None => {
                by_grantee.insert(grant.grantee.clone(), grant);
            }
        }
    }
    Ok(by_grantee
        .into_values()
        .filter(|g| !g.privileges.is_empty())
        .collect())
}

fn unquote_role(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_item() {
        let grant = parse_aclitem("postgres=arwdDxt/postgres").unwrap();
        assert_eq!(grant.grantee, "postgres");
        assert_eq!(grant.privileges.len(), 7);
        assert!(grant.grantable.is_empty());
    }

    #[test]
    fn empty_grantee_is_public() {
        let grant = parse_aclitem("=U/postgres").unwrap();
        assert_eq!(grant.grantee, "PUBLIC");
        assert_eq!(grant.privileges, BTreeSet::from([Privilege::Usage]));
    }

    #[test]
    fn star_marks_grant_option() {
        let grant = parse_aclitem("alice=r*w/postgres").unwrap();
        assert_eq!(
            grant.privileges,
            BTreeSet::from([Privilege::Select, Privilege::Update])
        );
        assert_eq!(grant.grantable, BTreeSet::from([Privilege::Select]));
    }

    #[test]
    fn quoted_grantee_is_unquoted() {
        let grant = parse_aclitem(r#""Report ""Team"""=r/postgres"#).unwrap();
        assert_eq!(grant.grantee, r#"Report "Team""#);
    }

    #[test]
    fn malformed_item_is_incomplete_catalog_data() {
        let err = parse_aclitem("not an aclitem").unwrap_err();
        assert!(matches!(err, SchemaError::IncompleteCatalogData { .. }));
    }

    #[test]
    fn unknown_privilege_letters_are_skipped() {
        let grant = parse_aclitem("alice=rQ/postgres").unwrap();
        assert_eq!(grant.privileges, BTreeSet::from([Privilege::Select]));
    }

    #[test]
    fn parse_acl_merges_grantors_and_sorts() {
        let items = vec![
            "zed=r/postgres".to_string(),
            "alice=r/postgres".to_string(),
            "alice=w/bob".to_string(),
        ];
        let grants = parse_acl(&items).unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].grantee, "alice");
        assert_eq!(
            grants[0].privileges,
            BTreeSet::from([Privilege::Select, Privilege::Update])
        );
        assert_eq!(grants[1].grantee, "zed");
    }

    #[test]
    fn summarize_collapses_complete_set() {
        let grant = parse_aclitem("postgres=arwdDxtm/postgres").unwrap();
        let summary = grant.summarize(PrivilegeScope::Relation);
        assert_eq!(summary, vec![("all", false)]);

        let grant = parse_aclitem("postgres=arwdDxt/postgres").unwrap();
        assert_eq!(grant.summarize(PrivilegeScope::Relation), vec![("all", false)]);
    }

    #[test]
    fn mixed_grant_options_are_not_collapsed() {
        let grant = parse_aclitem("app=r*awdDxt/owner").unwrap();
        assert_eq!(
            grant.summarize(PrivilegeScope::Relation),
            vec![
                ("select", true),
                ("insert", false),
                ("update", false),
                ("delete", false),
                ("truncate", false),
                ("references", false),
                ("trigger", false),
            ]
        );

        let grant = parse_aclitem("app=r*a*w*d*D*x*t*m/owner").unwrap();
        let summary = grant.summarize(PrivilegeScope::Relation);
        assert_eq!(summary.len(), 8);
        assert_eq!(summary[7], ("maintain", false));
    }

    #[test]
    fn fully_grantable_relation_collapses() {
        let grant = parse_aclitem("app=r*a*w*d*D*x*t*m*/owner").unwrap();
        assert_eq!(grant.summarize(PrivilegeScope::Relation), vec![("all", true)]);
    }

    #[test]
    fn summarize_keeps_partial_set() {
        let grant = parse_aclitem("app=r*a/postgres").unwrap();
        let summary = grant.summarize(PrivilegeScope::Relation);
        assert_eq!(summary, vec![("select", true), ("insert", false)]);
    }

    #[test]
    fn summarize_schema_all_grantable() {
        let grant = parse_aclitem("admin=U*C*/postgres").unwrap();
        assert_eq!(grant.summarize(PrivilegeScope::Schema), vec![("all", true)]);
    }
}
