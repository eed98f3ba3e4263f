// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sapphire Calldata Encryption
//!
//! Oasis Sapphire executes contracts in a TEE and accepts calldata sealed to
//! the runtime's public key, so arguments such as passwords never appear on
//! chain or in node logs.
//!
//! ## Envelope
//!
//! 1. Fetch the runtime key with `oasis_callDataPublicKey`.
//! 2. Generate an ephemeral X25519 key pair and a 15-byte nonce.
//! 3. Derive the symmetric key as
//!    `HMAC-SHA512/256(key = "MRAE_Box_Deoxys-II-256-128", msg = X25519(sk, runtime_pk))`.
//! 4. Seal CBOR `{"body": calldata}` with Deoxys-II-256-128, no associated data.
//! 5. Send CBOR `{"body": {"pk", "data", "epoch"?, "nonce"}, "format": 1}` as
//!    the transaction input.
//!
//! Every attempt seals with a fresh key pair and nonce.

use alloy::{
    network::Ethereum,
    primitives::Bytes,
    providers::{DynProvider, Provider},
};
use ciborium::Value;
use deoxysii::{DeoxysII, NONCE_SIZE};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::Deserialize;
use sha2::Sha512_256;
use x25519_dalek::{PublicKey, StaticSecret};

use super::error::TxError;

/// JSON-RPC method returning the runtime's calldata public key.
pub const CALLDATA_PUBLIC_KEY_METHOD: &str = "oasis_callDataPublicKey";

/// Envelope format tag for X25519 + Deoxys-II.
const FORMAT_X25519_DEOXYSII: u64 = 1;

const KEY_DERIVATION_CONTEXT: &[u8] = b"MRAE_Box_Deoxys-II-256-128";

type HmacSha512_256 = Hmac<Sha512_256>;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("runtime public key must be 32 bytes, got {0}")]
    InvalidRuntimeKey(usize),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("CBOR encoding failed: {0}")]
    Encoding(String),
}

impl From<EnvelopeError> for TxError {
    fn from(e: EnvelopeError) -> Self {
        TxError::Unknown(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct CallDataPublicKeyResponse {
    key: Bytes,
    #[serde(default)]
    epoch: Option<u64>,
}

/// The runtime's calldata public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeKey {
    pub public_key: [u8; 32],
    pub epoch: Option<u64>,
}

impl RuntimeKey {
    /// Ask the node for the current runtime key.
    pub async fn fetch(provider: &DynProvider<Ethereum>) -> Result<Self, TxError> {
        let response: CallDataPublicKeyResponse = provider
            .raw_request(
                CALLDATA_PUBLIC_KEY_METHOD.into(),
                Vec::<serde_json::Value>::new(),
            )
            .await?;
        Ok(Self::from_response(response)?)
    }

    fn from_response(response: CallDataPublicKeyResponse) -> Result<Self, EnvelopeError> {
        let public_key: [u8; 32] = response
            .key
            .as_ref()
            .try_into()
            .map_err(|_| EnvelopeError::InvalidRuntimeKey(response.key.len()))?;
        Ok(Self {
            public_key,
            epoch: response.epoch,
        })
    }
}

/// Seal `calldata` for the runtime with a fresh key pair and nonce.
pub fn seal_calldata(runtime: &RuntimeKey, calldata: &[u8]) -> Result<Bytes, EnvelopeError> {
    let secret = StaticSecret::random_from_rng(OsRng);
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    seal_with(runtime, calldata, &secret, nonce)
}

fn seal_with(
    runtime: &RuntimeKey,
    calldata: &[u8],
    secret: &StaticSecret,
    nonce: [u8; NONCE_SIZE],
) -> Result<Bytes, EnvelopeError> {
    let public = PublicKey::from(secret);
    let key = derive_key(secret, &PublicKey::from(runtime.public_key))?;

    let plaintext = to_cbor(&Value::Map(vec![(
        text("body"),
        Value::Bytes(calldata.to_vec()),
    )]))?;
    let sealed = DeoxysII::new(&key).seal(&nonce, plaintext, Vec::new());

    let mut body = vec![
        (text("pk"), Value::Bytes(public.as_bytes().to_vec())),
        (text("data"), Value::Bytes(sealed)),
    ];
    if let Some(epoch) = runtime.epoch {
        body.push((text("epoch"), Value::Integer(epoch.into())));
    }
    body.push((text("nonce"), Value::Bytes(nonce.to_vec())));

    let envelope = Value::Map(vec![
        (text("body"), Value::Map(body)),
        (text("format"), Value::Integer(FORMAT_X25519_DEOXYSII.into())),
    ]);
    Ok(to_cbor(&envelope)?.into())
}

/// Deoxys-II key shared between `secret` and `peer`.
fn derive_key(secret: &StaticSecret, peer: &PublicKey) -> Result<[u8; 32], EnvelopeError> {
    let shared = secret.diffie_hellman(peer);
    let mut mac = <HmacSha512_256 as Mac>::new_from_slice(KEY_DERIVATION_CONTEXT)
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?;
    mac.update(shared.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    Ok(key)
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn to_cbor(value: &Value) -> Result<Vec<u8>, EnvelopeError> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|e| EnvelopeError::Encoding(format!("{e:?}")))?;
    Ok(out)
}
