use std::path::{PathBuf, Path, Component};
use std::fs::Metadata;
use std::io::ErrorKind;

/// metadata for a path, `None` if nothing exists there
pub fn metadata<P>(path: P) -> std::io::Result<Option<Metadata>>
where
    P: AsRef<Path>
{
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// resolves `.` and `..` lexically. config paths may point at files that
/// do not exist yet so the filesystem is not consulted.
pub fn normalize<P>(path: P) -> PathBuf
where
    P: AsRef<Path>
{
    let mut rtn = PathBuf::new();

    for comp in path.as_ref().components() {
        match comp {
            Component::CurDir => {},
            Component::ParentDir => {
                rtn.pop();
            },
            Component::Prefix(_) |
            Component::RootDir |
            Component::Normal(_) => rtn.push(comp.as_os_str()),
        }
    }

    rtn
}
