//! Emoji used across the terminal output, with plain-text fallbacks.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "[KEY]");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[>]");
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
