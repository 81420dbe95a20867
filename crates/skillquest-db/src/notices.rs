//! Notification texts shared by both store implementations.

use skillquest_types::{GradeDecision, NotificationKind};

/// A notification ready to be written for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notice {
    pub(crate) kind: NotificationKind,
    pub(crate) title: String,
    pub(crate) message: String,
}

pub(crate) fn quest_assigned(quest_title: &str) -> Notice {
    Notice {
        kind: NotificationKind::QuestAssigned,
        title: String::from("Neue Quest zugewiesen"),
        message: format!("Dir wurde die Quest \"{quest_title}\" zugewiesen!"),
    }
}

pub(crate) fn submission_received(character_name: &str, quest_title: &str) -> Notice {
    Notice {
        kind: NotificationKind::SubmissionReceived,
        title: String::from("Neue Abgabe eingegangen"),
        message: format!("{character_name} hat die Quest \"{quest_title}\" abgegeben!"),
    }
}

pub(crate) fn submission_graded(
    quest_title: &str,
    decision: GradeDecision,
    feedback: Option<&str>,
) -> Notice {
    let (title, mut message) = match decision {
        GradeDecision::Approved => (
            "Abgabe angenommen",
            format!("Deine Abgabe zur Quest \"{quest_title}\" wurde angenommen!"),
        ),
        GradeDecision::Rejected => (
            "Abgabe abgelehnt",
            format!("Deine Abgabe zur Quest \"{quest_title}\" wurde abgelehnt."),
        ),
    };
    if let Some(feedback) = feedback {
        message.push_str(" Feedback: ");
        message.push_str(feedback);
    }
    Notice {
        kind: NotificationKind::SubmissionGraded,
        title: title.to_owned(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_names_the_quest() {
        let notice = quest_assigned("Kabel crimpen");
        assert_eq!(notice.kind, NotificationKind::QuestAssigned);
        assert_eq!(notice.message, "Dir wurde die Quest \"Kabel crimpen\" zugewiesen!");
    }

    #[test]
    fn rejection_carries_feedback() {
        let notice = submission_graded("SQL Joins", GradeDecision::Rejected, Some("Bitte LEFT JOIN nutzen"));
        assert_eq!(notice.title, "Abgabe abgelehnt");
        assert!(notice.message.ends_with("Feedback: Bitte LEFT JOIN nutzen"));
    }
}
