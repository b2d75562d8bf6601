//! The supervisor's attachment dialogue as a pure state machine. `transition`
//! decides what happens next; the attachment handler carries out the effects
//! and sends the entry prompt of every state it moves into.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::bot::chat::{DocumentRef, IncomingMessage, Keyboard};
use crate::bot::commands::Command;
use crate::schedule::model::{EducationalActivity, GroupSchedule};
use crate::services::attachments::AttachmentRecord;
use crate::utils::datetime::parse_day_month;

pub const NO_ATTACHMENT: &str = "Без приложения";
pub const INVALID_DATE: &str = "Некорректная дата";
pub const NO_LESSONS_ON_DATE: &str = "На указанную дату занятий не найдено";
pub const ACTIVITY_NOT_FOUND: &str = "Указанная активность не найдена";
pub const NOTHING_SAVED: &str = "Нет сохранённых приложений";
pub const ATTACHMENT_NOT_FOUND: &str = "Указанное приложение не найдено";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDraft {
    pub date: NaiveDate,
    pub activity: EducationalActivity,
    pub comment: String,
    pub document: Option<DocumentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Default,
    WaitDate,
    WaitActivity {
        date: NaiveDate,
        options: Vec<EducationalActivity>,
    },
    WaitText {
        date: NaiveDate,
        activity: EducationalActivity,
    },
    WaitAttachment {
        date: NaiveDate,
        activity: EducationalActivity,
        comment: String,
    },
    /// Transient: persisted immediately, then back to `Default`.
    SaveAttachment(AttachmentDraft),
    WaitDeletion {
        options: Vec<(Uuid, String)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Prompt {
    pub fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    fn plain(text: &str) -> Self {
        Self::new(text, Keyboard::Keep)
    }
}

impl ConversationState {
    /// The message sent when the state becomes active.
    pub fn entry_prompt(&self) -> Option<Prompt> {
        let prompt = match self {
            ConversationState::Default => Prompt::new(
                "Доступные команды:\n/приложить\n/удалить\n/стат\n/закрыть",
                Keyboard::Options(vec![
                    "/приложить".to_string(),
                    "/удалить".to_string(),
                    "/стат".to_string(),
                    "/закрыть".to_string(),
                ]),
            ),
            ConversationState::WaitDate => Prompt::new("Укажите дату", Keyboard::Remove),
            ConversationState::WaitActivity { options, .. } => Prompt::new(
                "Укажите активность для приложения",
                Keyboard::Options(options.iter().map(EducationalActivity::label).collect()),
            ),
            ConversationState::WaitText { .. } => Prompt::new("Добавьте комментарий к активности", Keyboard::Remove),
            ConversationState::WaitAttachment { .. } => Prompt::new(
                "Добавьте при необходимости приложения к активности",
                Keyboard::Options(vec![NO_ATTACHMENT.to_string()]),
            ),
            ConversationState::SaveAttachment(_) => return None,
            ConversationState::WaitDeletion { options } => Prompt::new(
                "Выберите приложение для удаления",
                Keyboard::Options(options.iter().map(|(_, label)| label.clone()).collect()),
            ),
        };
        Some(prompt)
    }
}

/// What the handler should do in response to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Stay,
    /// Stay and answer with this prompt.
    Reply(Prompt),
    Enter(ConversationState),
    /// Send the attachments dated tomorrow to the group chat now.
    DeliverTomorrow,
    /// Remove the saved attachment, then return to `Default`.
    Delete(Uuid),
}

pub struct ConversationContext<'a> {
    pub today: NaiveDate,
    pub schedule: Option<&'a GroupSchedule>,
    pub saved: &'a [AttachmentRecord],
}

pub fn transition(
    state: &ConversationState,
    message: &IncomingMessage,
    command: Option<&Command>,
    context: &ConversationContext<'_>,
) -> Transition {
    if command == Some(&Command::Exit) {
        return match state {
            ConversationState::Default => Transition::Stay,
            _ => Transition::Enter(ConversationState::Default),
        };
    }

    let text = message.text().trim();

    match state {
        ConversationState::Default => match command {
            Some(Command::Attach) => Transition::Enter(ConversationState::WaitDate),
            Some(Command::Delete) => {
                let options: Vec<(Uuid, String)> = context
                    .saved
                    .iter()
                    .filter(|record| record.date >= context.today)
                    .map(|record| (record.id, record.label()))
                    .collect();
                if options.is_empty() {
                    Transition::Reply(Prompt::plain(NOTHING_SAVED))
                } else {
                    Transition::Enter(ConversationState::WaitDeletion { options })
                }
            }
            Some(Command::Close) => Transition::DeliverTomorrow,
            _ => Transition::Stay,
        },
        // Other commands are not conversation input
        _ if command.is_some() => Transition::Stay,
        ConversationState::WaitDate => {
            let Some(date) = parse_day_month(text, context.today) else {
                return Transition::Reply(Prompt::plain(INVALID_DATE));
            };
            let options = context
                .schedule
                .map(|schedule| schedule.day_activities(date))
                .unwrap_or_default();
            if options.is_empty() {
                return Transition::Reply(Prompt::plain(NO_LESSONS_ON_DATE));
            }
            Transition::Enter(ConversationState::WaitActivity { date, options })
        }
        ConversationState::WaitActivity { date, options } => {
            match options.iter().find(|a| a.label() == text || a.name() == text) {
                Some(activity) => Transition::Enter(ConversationState::WaitText {
                    date: *date,
                    activity: activity.clone(),
                }),
                None => Transition::Reply(Prompt::new(
                    ACTIVITY_NOT_FOUND,
                    Keyboard::Options(options.iter().map(EducationalActivity::label).collect()),
                )),
            }
        }
        ConversationState::WaitText { date, activity } => {
            if text.is_empty() {
                return state.entry_prompt().map_or(Transition::Stay, Transition::Reply);
            }
            Transition::Enter(ConversationState::WaitAttachment {
                date: *date,
                activity: activity.clone(),
                comment: text.to_string(),
            })
        }
        ConversationState::WaitAttachment { date, activity, comment } => {
            let document = message.document.clone();
            if document.is_none() && text != NO_ATTACHMENT {
                return state.entry_prompt().map_or(Transition::Stay, Transition::Reply);
            }
            Transition::Enter(ConversationState::SaveAttachment(AttachmentDraft {
                date: *date,
                activity: activity.clone(),
                comment: comment.clone(),
                document,
            }))
        }
        ConversationState::SaveAttachment(_) => Transition::Stay,
        ConversationState::WaitDeletion { options } => {
            match options.iter().find(|(_, label)| label == text) {
                Some((id, _)) => Transition::Delete(*id),
                None => Transition::Reply(Prompt::plain(ATTACHMENT_NOT_FOUND)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::calendar::{Semester, SemesterSeason};
    use crate::schedule::model::{ActivityDescriber, Group, LessonType};
    use chrono::{NaiveTime, Weekday};
    use std::collections::BTreeSet;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
    }

    fn physics() -> EducationalActivity {
        EducationalActivity::new(
            "Физика",
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            "Иванов",
            "А-1",
            LessonType::Lecture,
        )
    }

    fn schedule() -> GroupSchedule {
        let semester = Semester::for_season(SemesterSeason::Autumn, 2025).unwrap();
        GroupSchedule {
            group: Group::parse("ИКБО-01-22").unwrap(),
            semester,
            describers: vec![ActivityDescriber {
                activity: physics(),
                active_weeks: (1..=18).collect::<BTreeSet<u32>>(),
                weekday: Weekday::Tue,
            }],
        }
    }

    fn text(value: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: 1,
            text: Some(value.to_string()),
            ..IncomingMessage::default()
        }
    }

    fn step(state: &ConversationState, message: &IncomingMessage, command: Option<Command>) -> Transition {
        let schedule = schedule();
        let context = ConversationContext {
            today: today(),
            schedule: Some(&schedule),
            saved: &[],
        };
        transition(state, message, command.as_ref(), &context)
    }

    #[test]
    fn test_attach_command_starts_dialogue() {
        let next = step(&ConversationState::Default, &text("/приложить"), Some(Command::Attach));
        assert_eq!(next, Transition::Enter(ConversationState::WaitDate));
    }

    #[test]
    fn test_invalid_date_keeps_waiting() {
        let next = step(&ConversationState::WaitDate, &text("завтра"), None);
        assert_eq!(next, Transition::Reply(Prompt::plain(INVALID_DATE)));
    }

    #[test]
    fn test_date_without_lessons_keeps_waiting() {
        // 01.09.2025 is a Monday, lessons are on Tuesdays
        let next = step(&ConversationState::WaitDate, &text("01.09"), None);
        assert_eq!(next, Transition::Reply(Prompt::plain(NO_LESSONS_ON_DATE)));
    }

    #[test]
    fn test_date_offers_that_days_lessons() {
        let next = step(&ConversationState::WaitDate, &text("02.09"), None);
        let Transition::Enter(ConversationState::WaitActivity { date, options }) = next else {
            panic!("expected WaitActivity, got {:?}", next);
        };
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 9, 2).unwrap());
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].name(), "Физика");
    }

    #[test]
    fn test_unknown_activity_is_rejected() {
        let state = ConversationState::WaitActivity {
            date: today(),
            options: vec![physics()],
        };
        assert_eq!(
            step(&state, &text("[10:40] Химия"), None),
            Transition::Reply(Prompt::new(
                ACTIVITY_NOT_FOUND,
                Keyboard::Options(vec!["[09:00] Физика".to_string()])
            ))
        );

        let Transition::Enter(ConversationState::WaitText { activity, .. }) = step(&state, &text("[09:00] Физика"), None)
        else {
            panic!("expected WaitText");
        };
        assert_eq!(activity.name(), "Физика");
    }

    #[test]
    fn test_no_attachment_choice_saves_without_file() {
        let state = ConversationState::WaitAttachment {
            date: today(),
            activity: physics(),
            comment: "Прочитать главу 3".to_string(),
        };
        let Transition::Enter(ConversationState::SaveAttachment(draft)) = step(&state, &text(NO_ATTACHMENT), None) else {
            panic!("expected SaveAttachment");
        };
        assert_eq!(draft.comment, "Прочитать главу 3");
        assert!(draft.document.is_none());
    }

    #[test]
    fn test_document_is_captured_in_draft() {
        let state = ConversationState::WaitAttachment {
            date: today(),
            activity: physics(),
            comment: "Слайды".to_string(),
        };
        let mut message = text("");
        message.text = None;
        message.document = Some(DocumentRef {
            file_id: "file-1".to_string(),
            file_name: Some("slides.pdf".to_string()),
        });

        let Transition::Enter(ConversationState::SaveAttachment(draft)) = step(&state, &message, None) else {
            panic!("expected SaveAttachment");
        };
        assert_eq!(draft.document.map(|d| d.file_id), Some("file-1".to_string()));
    }

    #[test]
    fn test_empty_comment_repeats_prompt() {
        let state = ConversationState::WaitText {
            date: today(),
            activity: physics(),
        };
        let sticker = IncomingMessage {
            chat_id: 1,
            ..IncomingMessage::default()
        };
        assert_eq!(
            step(&state, &sticker, None),
            Transition::Reply(Prompt::new("Добавьте комментарий к активности", Keyboard::Remove))
        );
    }

    #[test]
    fn test_exit_returns_to_default_from_any_state() {
        let states = vec![
            ConversationState::WaitDate,
            ConversationState::WaitText {
                date: today(),
                activity: physics(),
            },
            ConversationState::WaitDeletion { options: Vec::new() },
        ];
        for state in states {
            assert_eq!(
                step(&state, &text("/выход"), Some(Command::Exit)),
                Transition::Enter(ConversationState::Default)
            );
        }
        assert_eq!(
            step(&ConversationState::Default, &text("/выход"), Some(Command::Exit)),
            Transition::Stay
        );
    }

    #[test]
    fn test_delete_without_saved_records() {
        assert_eq!(
            step(&ConversationState::Default, &text("/удалить"), Some(Command::Delete)),
            Transition::Reply(Prompt::plain(NOTHING_SAVED))
        );
    }

    #[test]
    fn test_delete_offers_only_pending_records() {
        let record = |day: u32| AttachmentRecord {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 9, day).unwrap(),
            activity: physics(),
            comment: String::new(),
            attachment: None,
        };
        let saved = vec![record(1), record(2)];
        // Today is 03.09
        let context = ConversationContext {
            today: NaiveDate::from_ymd_opt(2025, 9, 3).unwrap(),
            schedule: None,
            saved: &saved,
        };
        let next = transition(&ConversationState::Default, &text("/удалить"), Some(&Command::Delete), &context);
        assert_eq!(next, Transition::Reply(Prompt::plain(NOTHING_SAVED)));

        let context = ConversationContext { today: today(), ..context };
        let Transition::Enter(ConversationState::WaitDeletion { options }) =
            transition(&ConversationState::Default, &text("/удалить"), Some(&Command::Delete), &context)
        else {
            panic!("expected WaitDeletion");
        };
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].1, "01.09.2025 [09:00] Физика");
    }

    #[test]
    fn test_close_in_default_delivers_tomorrow() {
        assert_eq!(
            step(&ConversationState::Default, &text("/закрыть"), Some(Command::Close)),
            Transition::DeliverTomorrow
        );
    }

    #[test]
    fn test_every_waiting_state_has_a_prompt() {
        assert!(ConversationState::WaitDate.entry_prompt().is_some());
        assert!(ConversationState::Default.entry_prompt().is_some());
        let save = ConversationState::SaveAttachment(AttachmentDraft {
            date: today(),
            activity: physics(),
            comment: String::new(),
            document: None,
        });
        assert!(save.entry_prompt().is_none());
    }
}
