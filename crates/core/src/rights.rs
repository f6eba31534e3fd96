//! Per-object access rights and the view decision.
//!
//! A [`RightsRecord`] is an immutable snapshot of the rights metadata for
//! one object: four access lists (read/edit x people/groups), an optional
//! embargo instant, and the schema version of the document it was parsed
//! from. Decisions are only defined for version [`crate::RIGHTS_VERSION`];
//! anything else is a hard error, not a deny.

use crate::error::{Error, Result};
use crate::user::{User, intersects, is_member};
use serde::Deserialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Outcome of an authorization check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// The user may view the object.
    Allow,
    /// The user may not view the object.
    Deny,
    /// The object (or its rights document) was not found.
    NotFound,
    /// The check could not be performed.
    Error,
}

/// Immutable access rights for a single object.
#[derive(Clone, Debug, Default)]
pub struct RightsRecord {
    pub version: String,
    pub read_groups: Vec<String>,
    pub read_people: Vec<String>,
    pub edit_groups: Vec<String>,
    pub edit_people: Vec<String>,
    /// Instant before which only editors may view. `None` means no embargo.
    pub embargo: Option<OffsetDateTime>,
}

impl RightsRecord {
    /// Decide whether `user` may view the object at instant `now`.
    ///
    /// People lists and group lists are disjoint namespaces: a user id
    /// appearing literally inside a group list does not grant access via
    /// the people check, and vice versa. The `"public"` and `"registered"`
    /// literals are checked only against the group lists. Edit rights
    /// always imply read rights.
    pub fn decide(&self, user: &User, now: OffsetDateTime) -> Access {
        if self.version != crate::RIGHTS_VERSION {
            return Access::Error;
        }
        if let Some(embargo) = self.embargo
            && now < embargo
        {
            // under embargo only editors may view, regardless of read grants
            if is_member(&user.id, &self.edit_people)
                || intersects(&user.groups, &self.edit_groups)
            {
                return Access::Allow;
            }
            return Access::Deny;
        }

        if is_member("public", &self.read_groups) || is_member("public", &self.edit_groups) {
            return Access::Allow;
        }
        if !user.id.is_empty()
            && (is_member("registered", &self.read_groups)
                || is_member("registered", &self.edit_groups))
        {
            return Access::Allow;
        }
        if intersects(&user.groups, &self.read_groups)
            || intersects(&user.groups, &self.edit_groups)
        {
            return Access::Allow;
        }
        if is_member(&user.id, &self.read_people) || is_member(&user.id, &self.edit_people) {
            return Access::Allow;
        }
        Access::Deny
    }

    /// Parse a rights document from its XML serialization.
    ///
    /// The document has a version attribute, repeated `access` blocks
    /// tagged `read` or `edit` with nested person and group lists, and an
    /// optional embargo calendar date (no time component; taken as
    /// midnight UTC). An unparsable embargo date is logged and ignored.
    pub fn from_xml(data: &[u8]) -> Result<Self> {
        let doc: RightsDoc = quick_xml::de::from_reader(data)
            .map_err(|e| Error::MalformedRights(e.to_string()))?;

        let mut record = RightsRecord {
            version: doc.version,
            ..Default::default()
        };
        for block in doc.access {
            let machine = block.machine.unwrap_or_default();
            match block.kind.as_str() {
                "read" => {
                    record.read_groups.extend(machine.group);
                    record.read_people.extend(machine.person);
                }
                "edit" => {
                    record.edit_groups.extend(machine.group);
                    record.edit_people.extend(machine.person);
                }
                other => {
                    tracing::debug!(kind = %other, "ignoring unknown access block");
                }
            }
        }

        if let Some(date) = doc.embargo.and_then(|e| e.machine).and_then(|m| m.date)
            && !date.is_empty()
        {
            let format = format_description!("[year]-[month]-[day]");
            match Date::parse(&date, &format) {
                Ok(d) => record.embargo = Some(d.midnight().assume_utc()),
                Err(e) => {
                    tracing::warn!(embargo = %date, error = %e, "ignoring unparsable embargo date");
                }
            }
        }

        Ok(record)
    }
}

// Deserialization shapes for the rights document XML.

#[derive(Debug, Deserialize)]
struct RightsDoc {
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "access", default)]
    access: Vec<AccessBlock>,
    #[serde(default)]
    embargo: Option<EmbargoBlock>,
}

#[derive(Debug, Deserialize)]
struct AccessBlock {
    #[serde(rename = "@type", default)]
    kind: String,
    #[serde(default)]
    machine: Option<MachineBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct MachineBlock {
    #[serde(default)]
    person: Vec<String>,
    #[serde(default)]
    group: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbargoBlock {
    #[serde(default)]
    machine: Option<EmbargoMachine>,
}

#[derive(Debug, Deserialize)]
struct EmbargoMachine {
    #[serde(default)]
    date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn set(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn fixture() -> RightsRecord {
        RightsRecord {
            version: "0.1".to_string(),
            read_groups: set(&["apple", "banana", "carrot"]),
            read_people: set(&["dog", "elephant", "faries"]),
            edit_groups: set(&["grapes", "hay", "igloo"]),
            edit_people: set(&["jerky", "kite", "leek"]),
            embargo: None,
        }
    }

    struct Case {
        user: &'static str,
        groups: &'static [&'static str],
        allowed: Access,
        registered: Access,
        embargo: Access,
    }

    const TABLE: &[Case] = &[
        // read person can read
        Case {
            user: "elephant",
            groups: &[],
            allowed: Access::Allow,
            registered: Access::Allow,
            embargo: Access::Deny,
        },
        // read group can read
        Case {
            user: "xerxes",
            groups: &["yak", "carrot"],
            allowed: Access::Allow,
            registered: Access::Allow,
            embargo: Access::Deny,
        },
        // edit person can read, even under embargo
        Case {
            user: "kite",
            groups: &["yak", "water"],
            allowed: Access::Allow,
            registered: Access::Allow,
            embargo: Access::Allow,
        },
        // edit group can read, even under embargo
        Case {
            user: "xerxes",
            groups: &["yak", "water", "igloo"],
            allowed: Access::Allow,
            registered: Access::Allow,
            embargo: Access::Allow,
        },
        // people and groups are separate namespaces
        Case {
            user: "xerxes",
            groups: &["kite"],
            allowed: Access::Deny,
            registered: Access::Allow,
            embargo: Access::Deny,
        },
        // anonymous cannot read yet
        Case {
            user: "",
            groups: &[],
            allowed: Access::Deny,
            registered: Access::Deny,
            embargo: Access::Deny,
        },
    ];

    fn run(rights: &RightsRecord, pick: impl Fn(&Case) -> Access) {
        let now = OffsetDateTime::now_utc();
        for case in TABLE {
            let user = User::new(case.user, set(case.groups));
            let got = rights.decide(&user, now);
            assert_eq!(
                got,
                pick(case),
                "user {:?} groups {:?}",
                case.user,
                case.groups
            );
        }
    }

    #[test]
    fn decision_matrix_base() {
        run(&fixture(), |c| c.allowed);
    }

    #[test]
    fn decision_matrix_registered() {
        let mut rights = fixture();
        rights.read_groups.push("registered".to_string());
        run(&rights, |c| c.registered);
    }

    #[test]
    fn decision_matrix_public_allows_everyone() {
        let mut rights = fixture();
        rights.read_groups.push("registered".to_string());
        rights.read_groups.push("public".to_string());
        run(&rights, |_| Access::Allow);
    }

    #[test]
    fn decision_matrix_embargo_editors_only() {
        let mut rights = fixture();
        rights.read_groups.push("registered".to_string());
        rights.read_groups.push("public".to_string());
        rights.embargo = Some(OffsetDateTime::now_utc() + Duration::hours(1));
        run(&rights, |c| c.embargo);
    }

    #[test]
    fn decision_matrix_bad_version_never_allows() {
        let mut rights = fixture();
        rights.version = "0.2".to_string();
        let now = OffsetDateTime::now_utc();
        for case in TABLE {
            let user = User::new(case.user, set(case.groups));
            assert_eq!(rights.decide(&user, now), Access::Error);
        }
    }

    #[test]
    fn expired_embargo_is_inactive() {
        let mut rights = fixture();
        rights.embargo = Some(OffsetDateTime::now_utc() - Duration::hours(1));
        let now = OffsetDateTime::now_utc();
        let user = User::new("elephant", vec![]);
        assert_eq!(rights.decide(&user, now), Access::Allow);
    }

    #[test]
    fn parse_rights_document() {
        let xml = r#"
            <rightsMetadata version="0.1">
              <access type="read">
                <machine>
                  <group>public</group>
                  <person>alice</person>
                </machine>
              </access>
              <access type="edit">
                <machine>
                  <person>bob</person>
                  <group>curators</group>
                </machine>
              </access>
              <embargo>
                <machine>
                  <date>2031-06-15</date>
                </machine>
              </embargo>
            </rightsMetadata>"#;

        let rights = RightsRecord::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(rights.version, "0.1");
        assert_eq!(rights.read_groups, set(&["public"]));
        assert_eq!(rights.read_people, set(&["alice"]));
        assert_eq!(rights.edit_groups, set(&["curators"]));
        assert_eq!(rights.edit_people, set(&["bob"]));
        let embargo = rights.embargo.unwrap();
        assert_eq!(embargo.date(), time::macros::date!(2031 - 06 - 15));
    }

    #[test]
    fn parse_merges_repeated_access_blocks() {
        let xml = r#"
            <rightsMetadata version="0.1">
              <access type="read">
                <machine><group>apple</group></machine>
              </access>
              <access type="read">
                <machine><group>banana</group></machine>
              </access>
            </rightsMetadata>"#;

        let rights = RightsRecord::from_xml(xml.as_bytes()).unwrap();
        assert_eq!(rights.read_groups, set(&["apple", "banana"]));
    }

    #[test]
    fn parse_ignores_bad_embargo_date() {
        let xml = r#"
            <rightsMetadata version="0.1">
              <embargo><machine><date>June 2031</date></machine></embargo>
            </rightsMetadata>"#;

        let rights = RightsRecord::from_xml(xml.as_bytes()).unwrap();
        assert!(rights.embargo.is_none());
    }

    #[test]
    fn parse_rejects_non_xml() {
        assert!(RightsRecord::from_xml(b"not xml at all <<<").is_err());
    }
}
