use attendance_bot::bot::commands::{parse_command, Command};
use teloxide::utils::command::BotCommands;

#[cfg(test)]
mod command_parsing_tests {
    use super::*;

    #[test]
    fn test_help_command_parsing() {
        assert_eq!(parse_command("/help", "testbot"), Some(Command::Help));
    }

    #[test]
    fn test_cyrillic_commands_parsing() {
        assert_eq!(parse_command("/стат", "testbot"), Some(Command::Stat));
        assert_eq!(parse_command("/закрыть", "testbot"), Some(Command::Close));
        assert_eq!(parse_command("/приложить", "testbot"), Some(Command::Attach));
        assert_eq!(parse_command("/удалить", "testbot"), Some(Command::Delete));
        assert_eq!(parse_command("/выход", "testbot"), Some(Command::Exit));
        assert_eq!(parse_command("/обновить", "testbot"), Some(Command::Refresh));
    }

    #[test]
    fn test_register_command_with_group_name() {
        assert_eq!(
            parse_command("/зарегистрировать ИКБО-01-23", "testbot"),
            Some(Command::Register("ИКБО-01-23".to_string()))
        );
    }

    #[test]
    fn test_register_command_keeps_argument_case() {
        assert_eq!(
            parse_command("/ЗАРЕГИСТРИРОВАТЬ икбо-01-23", "testbot"),
            Some(Command::Register("икбо-01-23".to_string()))
        );
    }

    #[test]
    fn test_name_command_with_full_name() {
        assert_eq!(
            parse_command("/имя Иванов Иван Иванович", "testbot"),
            Some(Command::Name("Иванов Иван Иванович".to_string()))
        );
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        assert_eq!(parse_command("/СТАТ", "testbot"), Some(Command::Stat));
        assert_eq!(parse_command("/Закрыть", "testbot"), Some(Command::Close));
        assert_eq!(parse_command("/HELP", "testbot"), Some(Command::Help));
    }

    #[test]
    fn test_command_with_bot_mention() {
        assert_eq!(parse_command("/стат@testbot", "testbot"), Some(Command::Stat));
        assert_eq!(parse_command("/стат@TestBot", "TestBot"), Some(Command::Stat));
    }

    #[test]
    fn test_command_for_other_bot_is_rejected() {
        assert_eq!(parse_command("/стат@otherbot", "testbot"), None);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(parse_command("  /выход  ", "testbot"), Some(Command::Exit));
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse_command("стат", "testbot"), None);
        assert_eq!(parse_command("", "testbot"), None);
        assert_eq!(parse_command("02.05", "testbot"), None);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert_eq!(parse_command("/start", "testbot"), None);
        assert_eq!(parse_command("/schedule", "testbot"), None);
    }

    #[test]
    fn test_descriptions_list_every_command() {
        let descriptions = Command::descriptions().to_string();
        for name in ["/help", "/зарегистрировать", "/имя", "/стат", "/закрыть", "/приложить", "/удалить", "/выход", "/обновить"] {
            assert!(descriptions.contains(name), "missing {name} in help text");
        }
    }
}
