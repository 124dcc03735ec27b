//! Email rosters and the assignment diff between the two services.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// User id → lowercased email for one project on one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailRoster {
    entries: BTreeMap<String, String>,
}

impl EmailRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, email: &str) {
        self.entries
            .insert(id.into(), email.trim().to_lowercase());
    }

    pub fn contains_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.entries.values().any(|e| *e == email)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Ids whose email matches, case-insensitively.
    pub fn ids_for(&self, email: &str) -> impl Iterator<Item = &str> {
        let email = email.trim().to_lowercase();
        self.entries
            .iter()
            .filter(move |(_, e)| **e == email)
            .map(|(id, _)| id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<I: Into<String>, E: AsRef<str>> FromIterator<(I, E)> for EmailRoster {
    fn from_iter<T: IntoIterator<Item = (I, E)>>(iter: T) -> Self {
        let mut roster = EmailRoster::new();
        for (id, email) in iter {
            roster.insert(id, email.as_ref());
        }
        roster
    }
}

/// Changes needed to make the time-tracking roster match the task roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterDiff {
    /// Emails present on the task side but not assigned on the time side.
    pub to_add: Vec<String>,
    /// Time-side user ids whose email is not on the task side.
    pub to_remove: Vec<String>,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

pub fn diff(task: &EmailRoster, time: &EmailRoster) -> RosterDiff {
    let to_remove = time
        .iter()
        .filter(|(_, email)| !task.contains_email(email))
        .map(|(id, _)| id.to_string())
        .collect();

    let to_add: BTreeSet<&str> = task
        .iter()
        .map(|(_, email)| email)
        .filter(|email| !time.contains_email(email))
        .collect();

    RosterDiff {
        to_add: to_add.into_iter().map(str::to_string).collect(),
        to_remove,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case() {
        let task: EmailRoster = [("1", "a@x.com")].into_iter().collect();
        let time: EmailRoster = [("9", "A@X.COM")].into_iter().collect();
        assert!(diff(&task, &time).is_empty());
    }

    #[test]
    fn empty_task_roster_removes_everyone() {
        let task = EmailRoster::new();
        let time: EmailRoster = [("9", "a@x.com")].into_iter().collect();
        let d = diff(&task, &time);
        assert_eq!(d.to_remove, vec!["9"]);
        assert!(d.to_add.is_empty());
    }

    #[test]
    fn mixed_changes() {
        let task: EmailRoster = [("1", "a@x.com"), ("2", "B@x.com"), ("3", "c@x.com")]
            .into_iter()
            .collect();
        let time: EmailRoster = [("9", "a@x.com"), ("10", "old@x.com")]
            .into_iter()
            .collect();

        let d = diff(&task, &time);
        assert_eq!(d.to_add, vec!["b@x.com", "c@x.com"]);
        assert_eq!(d.to_remove, vec!["10"]);
    }

    #[test]
    fn duplicate_task_emails_are_added_once() {
        let task: EmailRoster = [("1", "a@x.com"), ("2", "A@x.com")].into_iter().collect();
        let d = diff(&task, &EmailRoster::new());
        assert_eq!(d.to_add, vec!["a@x.com"]);
    }

    #[test]
    fn ids_for_finds_every_match() {
        let roster: EmailRoster = [("1", "a@x.com"), ("2", "b@x.com")].into_iter().collect();
        assert_eq!(roster.ids_for("A@X.com").collect::<Vec<_>>(), vec!["1"]);
        assert_eq!(roster.len(), 2);
    }
}
