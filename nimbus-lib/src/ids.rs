pub const UID_SIZE: usize = 16;
pub const UID_ALPHABET: [char; 63] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    '_'
];

/// ids handed out by the backend are opaque strings
pub type DiskId = String;
pub type FileId = String;
pub type UserId = String;
pub type StorageRequestId = String;

/// upload ids are local to the client and never sent to the backend
pub type UploadId = String;

pub fn create_uid() -> String {
    nanoid::format(nanoid::rngs::default, &UID_ALPHABET, UID_SIZE)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uid_uses_alphabet() {
        let uid = create_uid();

        assert_eq!(uid.chars().count(), UID_SIZE);
        assert!(uid.chars().all(|ch| UID_ALPHABET.contains(&ch)), "unknown character in {:?}", uid);
        assert_ne!(uid, create_uid());
    }
}
