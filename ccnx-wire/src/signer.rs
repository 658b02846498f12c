//! RSA-SHA256 message validation: loading a private key from a PEM file,
//! deriving a KeyId, and signing a content object's wire bytes.
//!
//! Mirrors the reference implementation's `CCNxSignature`: the KeyId is the
//! SHA-256 digest of the DER-encoded SubjectPublicKeyInfo, and the signature
//! covers everything from just after the fixed header through the end of
//! the content object's body TLV (i.e. the bytes `sign()` is handed, before
//! the validation TLVs it produces are appended).

use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::message::{valalg_tlv, ContentObject, Message, Validation};
use crate::{Error, Result};

/// A loaded RSA keypair able to sign content objects and to stamp its own
/// KeyId/public-key DER bytes into the validation TLVs it produces.
pub struct Signer {
    private_key: RsaPrivateKey,
    public_key_der: Vec<u8>,
    keyid: Vec<u8>,
}

impl Signer {
    /// Loads a PKCS#8 PEM-encoded RSA private key from `path`.
    pub fn from_pkcs8_pem_file(path: &std::path::Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_pkcs8_pem(&pem)
    }

    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| Error::Key(format!("invalid PKCS#8 private key: {e}")))?;
        let public_key = RsaPublicKey::from(&private_key);
        let public_key_der = public_key
            .to_public_key_der()
            .map_err(|e| Error::Key(format!("could not DER-encode public key: {e}")))?
            .as_bytes()
            .to_vec();
        let keyid = Sha256::digest(&public_key_der).to_vec();
        Ok(Signer { private_key, public_key_der, keyid })
    }

    pub fn keyid(&self) -> &[u8] {
        &self.keyid
    }

    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Signs the SHA-256 digest of `data` with PKCS#1 v1.5 padding.
    pub fn sign_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let digest = Sha256::digest(data);
        self.private_key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| Error::Key(format!("signing failed: {e}")))
    }

    /// Signs `content_object` in place: the signed region is the object's
    /// unsigned wire bytes (fixed header excluded) followed by the
    /// `T_VALALG` TLV this signature will be published alongside — per
    /// spec.md's `signed_region ∥ appended_valalg_bytes` — then attaches
    /// the resulting [`Validation`].
    pub fn sign_content_object(&self, content_object: &mut ContentObject) -> Result<()> {
        let unsigned = Message::ContentObject(content_object.clone());
        let wire = unsigned.wire_bytes();
        let signed_region = &wire[ccnx_tlv::FixedHeader::LEN..];

        let valalg_bytes = valalg_tlv(&self.keyid, &self.public_key_der).to_bytes();
        let mut to_sign = Vec::with_capacity(signed_region.len() + valalg_bytes.len());
        to_sign.extend_from_slice(signed_region);
        to_sign.extend_from_slice(&valalg_bytes);

        let signature = self.sign_bytes(&to_sign)?;
        content_object.validation = Some(Validation {
            keyid: self.keyid.clone(),
            public_key_der: self.public_key_der.clone(),
            signature,
        });
        Ok(())
    }
}

/// Computes the KeyId (SHA-256 of the DER-encoded SubjectPublicKeyInfo) for
/// a PEM-encoded RSA public key, without needing the matching private key —
/// what a consumer loads from `--pubkey` to restrict its first Interest to
/// one publisher.
pub fn keyid_from_public_key_pem(pem: &str) -> Result<Vec<u8>> {
    let public_key = RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| Error::Key(format!("invalid public key PEM: {e}")))?;
    let der = public_key
        .to_public_key_der()
        .map_err(|e| Error::Key(format!("could not DER-encode public key: {e}")))?
        .as_bytes()
        .to_vec();
    Ok(Sha256::digest(&der).to_vec())
}

/// Verifies a content object's validation signature against the public key
/// embedded in its own `Validation`. Used by consumers that trust
/// "whoever signed it, signed it consistently" rather than a separate trust
/// anchor — matching the reference decoder's self-contained verification.
pub fn verify(content_object: &ContentObject) -> Result<bool> {
    let validation = content_object
        .validation
        .as_ref()
        .ok_or(Error::MissingField("validation"))?;

    let mut unsigned = content_object.clone();
    unsigned.validation = None;
    let wire = Message::ContentObject(unsigned).wire_bytes();
    let signed_region = &wire[ccnx_tlv::FixedHeader::LEN..];

    let valalg_bytes = valalg_tlv(&validation.keyid, &validation.public_key_der).to_bytes();
    let mut to_sign = Vec::with_capacity(signed_region.len() + valalg_bytes.len());
    to_sign.extend_from_slice(signed_region);
    to_sign.extend_from_slice(&valalg_bytes);
    let digest = Sha256::digest(&to_sign);

    let public_key = RsaPublicKey::from_public_key_der(&validation.public_key_der)
        .map_err(|e| Error::Key(format!("invalid public key DER: {e}")))?;
    Ok(public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &validation.signature)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccnx_tlv::Name;
    use pkcs8::EncodePrivateKey;

    fn test_signer() -> Signer {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 1024).expect("key generation");
        let pem = private_key
            .to_pkcs8_pem(Default::default())
            .expect("pkcs8 encode")
            .to_string();
        Signer::from_pkcs8_pem(&pem).expect("signer load")
    }

    #[test]
    fn sign_and_verify_round_trips() {
        let signer = test_signer();
        let name = Name::from_uri("lci:/apple/pie").unwrap();
        let mut co = ContentObject::new(name, Some(1000), Some(vec![1, 2, 3]), None);
        signer.sign_content_object(&mut co).unwrap();
        assert!(co.is_signed());
        assert!(verify(&co).unwrap());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let signer = test_signer();
        let name = Name::from_uri("lci:/apple/pie").unwrap();
        let mut co = ContentObject::new(name, Some(1000), Some(vec![1, 2, 3]), None);
        signer.sign_content_object(&mut co).unwrap();
        co.payload = Some(vec![9, 9, 9]);
        assert!(!verify(&co).unwrap());
    }

    #[test]
    fn keyid_is_sha256_of_public_key_der() {
        let signer = test_signer();
        let expected = Sha256::digest(signer.public_key_der());
        assert_eq!(signer.keyid(), expected.as_slice());
    }
}
