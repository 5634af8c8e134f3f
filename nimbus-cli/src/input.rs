use std::io::Write;

/// prints the prompt and reads one line. an empty string means stdin was
/// closed.
pub fn read_stdin<P>(prompt: P) -> std::io::Result<String>
where
    P: AsRef<str>
{
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut buffer = String::new();

    stdout.write_all(prompt.as_ref().as_bytes())?;
    stdout.flush()?;

    stdin.read_line(&mut buffer)?;

    Ok(buffer)
}

pub fn read_yn<P>(prefix: P) -> std::io::Result<bool>
where
    P: std::fmt::Display
{
    let given = read_stdin(format!("{} [y|n]: ", prefix))?;

    Ok(given.trim()
        .chars()
        .next()
        .map(|first| first.to_ascii_lowercase() == 'y')
        .unwrap_or(false))
}
