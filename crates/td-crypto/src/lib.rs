use anyhow::{Context, Result, anyhow};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};
use zeroize::{Zeroize, Zeroizing};

/// EIP-191 version 0x45 prefix used by `personal_sign`.
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

pub const SIGNATURE_LEN: usize = 65;

pub trait MessageSigner: Send + Sync {
    fn address(&self) -> String;
    fn sign_message(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN]>;
}

pub struct Secp256k1Signer {
    signing_key: SigningKey,
}

impl Secp256k1Signer {
    pub fn new_random() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_secret_key_bytes(mut secret_key: [u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(&secret_key);
        secret_key.zeroize();
        Ok(Self {
            signing_key: signing_key.map_err(|_| anyhow!("invalid secp256k1 secret key"))?,
        })
    }

    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut bytes = Zeroizing::new([0_u8; 32]);
        bytes.copy_from_slice(&self.signing_key.to_bytes());
        bytes
    }

    pub fn public_key_hex(&self) -> String {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        hex::encode(point.as_bytes())
    }

    pub fn wallet_address(&self) -> String {
        address_from_verifying_key(self.signing_key.verifying_key())
    }
}

impl MessageSigner for Secp256k1Signer {
    fn address(&self) -> String {
        self.wallet_address()
    }

    fn sign_message(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
        let digest = hash_personal_message(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .context("secp256k1 signing failed")?;

        let mut output = [0_u8; SIGNATURE_LEN];
        output[..64].copy_from_slice(&signature.to_bytes());
        output[64] = 27 + recovery_id.to_byte();
        Ok(output)
    }
}

/// keccak256("\x19Ethereum Signed Message:\n" ++ len(message) ++ message)
pub fn hash_personal_message(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    let mut digest = [0_u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Lower-case `0x` address: last 20 bytes of keccak256 over the uncompressed key without its tag byte.
pub fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recovers the address that produced `signature` over `message` with `personal_sign`.
pub fn recover_address(message: &[u8], signature: &[u8]) -> Result<String> {
    if signature.len() != SIGNATURE_LEN {
        return Err(anyhow!(
            "signature must be {SIGNATURE_LEN} bytes, got {}",
            signature.len()
        ));
    }

    let v = signature[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let mut recovery_id =
        RecoveryId::from_byte(recovery_byte).ok_or_else(|| anyhow!("invalid recovery id {v}"))?;

    let mut parsed = Signature::from_slice(&signature[..64]).context("malformed signature")?;
    if let Some(normalized) = parsed.normalize_s() {
        parsed = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = hash_personal_message(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &parsed, recovery_id)
        .context("signature recovery failed")?;
    Ok(address_from_verifying_key(&key))
}

/// Recovers from a hex signature and compares against `expected` case-insensitively.
pub fn verify_personal_signature(message: &str, signature_hex: &str, expected: &str) -> Result<bool> {
    let signature = from_hex(signature_hex)?;
    let recovered = recover_address(message.as_bytes(), &signature)?;
    Ok(recovered.eq_ignore_ascii_case(expected))
}

pub fn to_prefixed_hex(input: &[u8]) -> String {
    format!("0x{}", hex::encode(input))
}

/// Decodes hex with or without a `0x` prefix.
pub fn from_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).with_context(|| format!("invalid hex string '{trimmed}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardhat / Anvil default account #0.
    const DEV_SECRET: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn dev_signer() -> Secp256k1Signer {
        let mut secret = [0_u8; 32];
        secret.copy_from_slice(&from_hex(DEV_SECRET).unwrap());
        Secp256k1Signer::from_secret_key_bytes(secret).unwrap()
    }

    #[test]
    fn derives_known_address() {
        assert_eq!(dev_signer().wallet_address(), DEV_ADDRESS);
    }

    #[test]
    fn signature_recovers_to_signer() {
        let signer = dev_signer();
        let message = b"Nonce: abc123";
        let signature = signer.sign_message(message).unwrap();

        assert!(signature[64] == 27 || signature[64] == 28);
        assert_eq!(recover_address(message, &signature).unwrap(), DEV_ADDRESS);
    }

    #[test]
    fn random_signers_round_trip_through_hex() {
        let signer = Secp256k1Signer::new_random();
        let signature = to_prefixed_hex(&signer.sign_message(b"hello").unwrap());
        assert!(verify_personal_signature("hello", &signature, &signer.address()).unwrap());
        assert!(!verify_personal_signature("hello!", &signature, &signer.address()).unwrap_or(false));
    }

    #[test]
    fn accepts_zero_based_recovery_byte() {
        let signer = dev_signer();
        let mut signature = signer.sign_message(b"payload").unwrap();
        signature[64] -= 27;
        assert_eq!(recover_address(b"payload", &signature).unwrap(), DEV_ADDRESS);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(recover_address(b"payload", &[0_u8; 64]).is_err());
    }

    #[test]
    fn personal_message_hash_matches_known_vector() {
        assert_eq!(
            hex::encode(hash_personal_message(b"Hello World")),
            "a1de988600a42c4b4ab089b619297c17d53cffae5d5120d82d8a92d0bb3b78f2"
        );
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(from_hex("0x0aff").unwrap(), vec![0x0a, 0xff]);
        assert_eq!(to_prefixed_hex(&[0x0a, 0xff]), "0x0aff");
        assert!(from_hex("0xabc").is_err());
        assert!(from_hex("zz").is_err());
        assert!(from_hex("0x\u{e9}\u{e9}").is_err());
        assert_eq!(from_hex(" 0XABCD ").unwrap(), vec![0xab, 0xcd]);
    }

    #[test]
    fn secret_key_round_trip() {
        let signer = Secp256k1Signer::new_random();
        let restored = Secp256k1Signer::from_secret_key_bytes(*signer.secret_key_bytes()).unwrap();
        assert_eq!(restored.wallet_address(), signer.wallet_address());
        assert_eq!(restored.public_key_hex().len(), 130);
    }
}
