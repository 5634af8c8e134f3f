use url::Url;

pub const MAX_NAME_CHARS: usize = 255;
pub const MAX_NOTE_CHARS: usize = 64 * 1024;
pub const MAX_REASON_CHARS: usize = 1024;

fn valid_name_char(ch: &char) -> bool {
    !matches!(ch, '/' | '\\') && !ch.is_control()
}

/// names of files, folders and disks. no leading or trailing whitespace, no
/// path separators and no control characters.
pub fn name_valid(given: &str) -> bool {
    let mut iter = given.chars();
    let mut count = 0;

    let Some(first) = iter.next() else {
        return false;
    };

    if first.is_whitespace() || !valid_name_char(&first) {
        return false;
    }

    count += 1;

    if let Some(last) = iter.next_back() {
        if last.is_whitespace() || !valid_name_char(&last) {
            return false;
        }

        count += 1;
    }

    for ch in iter {
        if !valid_name_char(&ch) {
            return false;
        }

        count += 1;

        if count > MAX_NAME_CHARS {
            return false;
        }
    }

    !matches!(given, "." | "..")
}

/// only absolute http and https urls with a host are accepted for bookmarks
pub fn http_url_valid(given: &str) -> bool {
    match Url::parse(given.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// free form text, rejects control characters other than newlines and tabs
pub fn text_valid(given: &str, max_chars: usize) -> bool {
    let mut count = 0;

    for ch in given.chars() {
        if ch.is_control() && ch != '\n' && ch != '\t' && ch != '\r' {
            return false;
        }

        count += 1;

        if count > max_chars {
            return false;
        }
    }

    true
}
