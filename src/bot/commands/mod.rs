use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Команды бота посещаемости:")]
pub enum Command {
    #[command(description = "Показать это сообщение")]
    Help,
    #[command(rename = "зарегистрировать", description = "Зарегистрировать группу (только администратор)")]
    Register(String),
    #[command(rename = "имя", description = "Указать своё имя для статистики")]
    Name(String),
    #[command(rename = "стат", description = "Статистика отсутствующих за текущий день")]
    Stat,
    #[command(rename = "закрыть", description = "Закрыть день и открыть следующий")]
    Close,
    #[command(rename = "приложить", description = "Приложить материалы к занятию")]
    Attach,
    #[command(rename = "удалить", description = "Удалить сохранённое приложение")]
    Delete,
    #[command(rename = "выход", description = "Выйти из текущего диалога")]
    Exit,
    #[command(rename = "обновить", description = "Обновить расписание (только администратор)")]
    Refresh,
}

/// Parses a command, treating the command word and bot mention case-insensitively.
pub fn parse_command(text: &str, bot_name: &str) -> Option<Command> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let normalized = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => format!("{} {}", head.to_lowercase(), rest.trim_start()),
        None => text.to_lowercase(),
    };

    Command::parse(&normalized, &bot_name.to_lowercase()).ok()
}
