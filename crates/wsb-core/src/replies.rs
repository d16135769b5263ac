//! User-facing reply texts.

use crate::media::MediaError;

pub const WM_FORMAT: &str = "❌ Format salah! Gunakan: *.wm nama-sticker*";
pub const WM_NOT_A_REPLY: &str = "❌ Kirim command ini dengan reply ke sticker!";
pub const WM_NOT_A_STICKER: &str = "❌ Reply harus ke sticker!";
pub const TAGALL_GROUP_ONLY: &str = "❌ Command ini hanya bisa digunakan di group!";
pub const REQUEST_FAILED: &str = "❌ Maaf, terjadi error saat memproses permintaan.";

pub const HELP: &str = r#"
🤖 *BOT STICKER WA* 🤖

*Cara penggunaan:*

*1. Sticker dengan Nama Default:*
   - Kirim gambar dengan caption *".s"*
   - Nama sticker: "Bot WhatsApp"

*2. Sticker dengan Nama Custom:*
   - Kirim gambar dengan caption *".s nama-sticker"*
   - Contoh: 
     • ".s Lucu" → nama sticker "Lucu"
     • ".s Keren Banget" → nama sticker "Keren Banget"

*3. Ganti Nama Sticker (.wm):*
   - *Reply* sebuah sticker dengan *".wm nama-baru"*
   - Contoh: Reply sticker + tulis ".wm Lucu"

*4. Tag All Members (.tagall):*
   - Ketik *".tagall"* di group untuk tag semua member
   - Atau *".tagall pesan-custom"* dengan pesan custom

*Note:* 
• Maksimal ukuran gambar 8MB
• .wm harus reply ke sticker yang sudah ada
• .tagall hanya bekerja di group
"#;

/// Usage banner logged once the session is ready.
pub const READY_BANNER: &[&str] = &[
    "- \".s\" untuk sticker dengan nama default",
    "- \".s [nama]\" untuk custom nama sticker",
    "- \"Reply sticker .wm <nama>\" untuk ganti nama sticker",
    "- \".tagall\" untuk tag semua member group",
    "- \".help\" untuk bantuan",
];

pub fn sticker_created(name: &str, default_name: &str) -> String {
    if name == default_name {
        "✅ Sticker berhasil dibuat! 🎉".to_string()
    } else {
        format!("✅ Sticker \"{name}\" berhasil dibuat! 🎉")
    }
}

pub fn sticker_renamed(name: &str) -> String {
    format!("✅ Sticker \"{name}\" berhasil dibuat! 🎉")
}

pub fn tagall_failed(detail: &str) -> String {
    format!("❌ Gagal melakukan tagall: {detail}")
}

/// Reply for a failed sticker operation: a headline chosen by error kind,
/// followed by the error itself for diagnostics.
pub fn media_failure(err: &MediaError) -> String {
    let headline = match err {
        MediaError::Timeout => "❌ Timeout saat mengunduh sticker. Coba lagi.",
        MediaError::EmptyMedia | MediaError::EmptyBuffer | MediaError::InvalidData(_) => {
            "❌ Sticker tidak valid. Coba dengan sticker lain."
        }
        MediaError::Oversize { .. } => "❌ Gambar terlalu besar! Maksimal 8MB.",
        MediaError::UnsupportedFormat(_) => "❌ Format tidak didukung.",
        MediaError::Encode(_) | MediaError::Transport(_) => {
            "❌ Maaf, terjadi error saat memproses sticker."
        }
    };
    format!("{headline}\n\nDetail: {err}")
}
