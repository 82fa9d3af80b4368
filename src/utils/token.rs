// src/utils/token.rs

use std::sync::Arc;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::{
    Hmac, Mac,
    digest::{Key, KeyInit},
};
use pbkdf2::pbkdf2_hmac;
use rand::{RngCore, rngs::OsRng};
use sha2::{Sha256, Sha512};
use url::Url;

use crate::{
    error::{AppError, QuizError},
    models::answer_sheet::Subject,
};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const PBKDF2_ROUNDS: u32 = 1000;
const SALT_LEN: usize = 16;
const IV_LEN: usize = 16;
const KEY_LEN: usize = 32;
/// One SHA-256 block, the native HMAC key size.
const MAC_KEY_LEN: usize = 64;
const TAG_LEN: usize = 32;

/// Stateless codec for answer-sheet access tokens.
///
/// A token is `salt.iv.ciphertext`, each part hex encoded. PBKDF2-HMAC-SHA512
/// stretches the long-lived secret and the token's own salt into an AES-256-CBC
/// key and an HMAC-SHA256 key, so every call to `encode` yields a different
/// string for the same (subject, quiz) pair. The last 32 bytes of the
/// ciphertext part are the HMAC tag over salt, IV and ciphertext; a token whose
/// tag does not verify is never decrypted.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Arc<str>,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }

    pub fn encode(&self, subject: Subject, quiz_id: i64) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let salt = hex::encode(salt);

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let keys = self.derive_keys(&salt);
        let plaintext = format!("{}:{}", subject.id(), quiz_id);
        let mut ciphertext = Aes256CbcEnc::new(&keys.cipher_key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        let tag = keys.mac(&salt, &iv, &ciphertext).finalize().into_bytes();
        ciphertext.extend_from_slice(&tag);

        format!("{}.{}.{}", salt, hex::encode(iv), hex::encode(ciphertext))
    }

    /// Recovers the (subject, quiz id) pair a token was issued for.
    pub fn decode(&self, token: &str) -> Result<(Subject, i64), QuizError> {
        let mut parts = token.split('.');
        let (Some(salt), Some(iv), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(QuizError::MalformedToken);
        };

        if salt.len() != SALT_LEN * 2 || hex::decode(salt).is_err() {
            return Err(QuizError::MalformedToken);
        }
        let iv: [u8; IV_LEN] = hex::decode(iv)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(QuizError::MalformedToken)?;
        let sealed = hex::decode(ciphertext).map_err(|_| QuizError::MalformedToken)?;
        if sealed.len() < IV_LEN + TAG_LEN {
            return Err(QuizError::MalformedToken);
        }
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let keys = self.derive_keys(salt);
        keys.mac(salt, &iv, ciphertext)
            .verify_slice(tag)
            .map_err(|_| QuizError::MalformedToken)?;

        let plaintext = Aes256CbcDec::new(&keys.cipher_key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| QuizError::MalformedToken)?;
        let plaintext = String::from_utf8(plaintext).map_err(|_| QuizError::MalformedToken)?;

        let (subject, quiz_id) = plaintext
            .split_once(':')
            .ok_or(QuizError::MalformedToken)?;
        let subject = subject.parse::<i64>().map_err(|_| QuizError::MalformedToken)?;
        let quiz_id = quiz_id.parse::<i64>().map_err(|_| QuizError::MalformedToken)?;

        Ok((Subject::from(subject), quiz_id))
    }

    fn derive_keys(&self, salt: &str) -> TokenKeys {
        let mut okm = [0u8; KEY_LEN + MAC_KEY_LEN];
        pbkdf2_hmac::<Sha512>(self.secret.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut okm);

        let mut keys = TokenKeys {
            cipher_key: [0u8; KEY_LEN],
            mac_key: [0u8; MAC_KEY_LEN],
        };
        keys.cipher_key.copy_from_slice(&okm[..KEY_LEN]);
        keys.mac_key.copy_from_slice(&okm[KEY_LEN..]);
        keys
    }
}

struct TokenKeys {
    cipher_key: [u8; KEY_LEN],
    mac_key: [u8; MAC_KEY_LEN],
}

impl TokenKeys {
    fn mac(&self, salt: &str, iv: &[u8], ciphertext: &[u8]) -> HmacSha256 {
        let mut mac = <HmacSha256 as KeyInit>::new(Key::<HmacSha256>::from_slice(&self.mac_key));
        mac.update(salt.as_bytes());
        mac.update(iv);
        mac.update(ciphertext);
        mac
    }
}

/// Builds the public link `{base_url}/quiz?hash={token}`.
pub fn quiz_link(base_url: &str, token: &str) -> Result<String, AppError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| AppError::InternalServerError(format!("Invalid BASE_URL: {}", e)))?;

    url.path_segments_mut()
        .map_err(|_| AppError::InternalServerError("BASE_URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push("quiz");
    url.query_pairs_mut().append_pair("hash", token);

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("3a25d5294b3ccba85955dda811b62134425f3e2d")
    }

    #[test]
    fn round_trips_members_and_guest() {
        let codec = codec();
        for (subject, quiz_id) in [
            (Subject::Personal(1), 1),
            (Subject::Personal(42), 9001),
            (Subject::Guest, 7),
        ] {
            let token = codec.encode(subject, quiz_id);
            assert_eq!(codec.decode(&token), Ok((subject, quiz_id)));
        }
    }

    #[test]
    fn each_token_is_fresh() {
        let codec = codec();
        let a = codec.encode(Subject::Personal(5), 3);
        let b = codec.encode(Subject::Personal(5), 3);

        assert_ne!(a, b);
        assert_eq!(codec.decode(&a), Ok((Subject::Personal(5), 3)));
        assert_eq!(codec.decode(&b), Ok((Subject::Personal(5), 3)));
    }

    #[test]
    fn token_has_three_hex_parts() {
        let token = codec().encode(Subject::Personal(5), 3);
        let parts: Vec<&str> = token.split('.').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), SALT_LEN * 2);
        assert_eq!(parts[1].len(), IV_LEN * 2);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn rejects_malformed_tokens() {
        let codec = codec();
        let token = codec.encode(Subject::Personal(5), 3);
        let (salt, rest) = token.split_once('.').unwrap();
        let (iv, ciphertext) = rest.split_once('.').unwrap();

        for bad in [
            String::new(),
            "not-a-token".to_string(),
            format!("{}.{}", salt, iv),
            format!("{}.{}.{}.00", salt, iv, ciphertext),
            format!("{}.{}.zz", salt, iv),
            format!("{}.{}.{}", salt, &iv[2..], ciphertext),
            format!("{}.{}.", salt, iv),
        ] {
            assert_eq!(codec.decode(&bad), Err(QuizError::MalformedToken), "{}", bad);
        }
    }

    #[test]
    fn flipped_iv_byte_cannot_retarget_token() {
        let codec = codec();
        let token = codec.encode(Subject::Personal(5), 3);
        let (salt, rest) = token.split_once('.').unwrap();
        let (iv, ciphertext) = rest.split_once('.').unwrap();

        // Turns the first plaintext byte '5' into '6' under plain CBC.
        let mut iv = hex::decode(iv).unwrap();
        iv[0] ^= b'5' ^ b'6';
        let forged = format!("{}.{}.{}", salt, hex::encode(iv), ciphertext);

        assert_eq!(codec.decode(&forged), Err(QuizError::MalformedToken));
    }

    #[test]
    fn altered_ciphertext_or_tag_is_rejected() {
        let codec = codec();
        let token = codec.encode(Subject::Guest, 3);
        let (head, sealed) = token.rsplit_once('.').unwrap();
        let mut sealed = hex::decode(sealed).unwrap();

        let mut body = sealed.clone();
        body[0] ^= 1;
        assert_eq!(
            codec.decode(&format!("{}.{}", head, hex::encode(body))),
            Err(QuizError::MalformedToken)
        );

        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        assert_eq!(
            codec.decode(&format!("{}.{}", head, hex::encode(sealed))),
            Err(QuizError::MalformedToken)
        );
    }

    #[test]
    fn other_secret_cannot_read_token() {
        let token = codec().encode(Subject::Personal(5), 3);
        let other = TokenCodec::new("a different secret");
        assert_eq!(other.decode(&token), Err(QuizError::MalformedToken));
    }

    #[test]
    fn builds_public_link() {
        assert_eq!(
            quiz_link("http://localhost:3000", "ab.cd.ef").unwrap(),
            "http://localhost:3000/quiz?hash=ab.cd.ef"
        );
        assert_eq!(
            quiz_link("https://example.org/app/", "ab.cd.ef").unwrap(),
            "https://example.org/app/quiz?hash=ab.cd.ef"
        );
    }
}
