use anyhow::{anyhow, Result};

pub fn validate_display_name(name: &str) -> Result<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(anyhow!("Display name cannot be empty"));
    }

    if name.chars().count() > 100 {
        return Err(anyhow!("Display name cannot be longer than 100 characters"));
    }

    if name.contains('\n') || name.contains('\r') {
        return Err(anyhow!("Display name cannot contain line breaks"));
    }

    Ok(())
}

pub fn validate_telegram_chat_id(chat_id: i64) -> Result<()> {
    if chat_id == 0 {
        return Err(anyhow!("Chat ID cannot be zero"));
    }

    // Private chats are positive and fit in 52 bits
    if chat_id > (1 << 52) {
        return Err(anyhow!("Invalid user chat ID range"));
    }

    // Supergroups start around -1000000000000
    if chat_id < -2000000000000 {
        return Err(anyhow!("Chat ID out of valid range"));
    }

    Ok(())
}
