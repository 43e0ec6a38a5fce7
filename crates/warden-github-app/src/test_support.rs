// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::OnceLock;

use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;

pub(crate) const TEST_APP_ID: u64 = 12345;

pub(crate) struct TestKeypair {
	pub(crate) private_pem: String,
	pub(crate) public_pem: String,
}

/// RSA generation is slow in debug builds; share one key across tests.
pub(crate) fn test_keypair() -> &'static TestKeypair {
	static KEYS: OnceLock<TestKeypair> = OnceLock::new();
	KEYS.get_or_init(|| {
		let mut rng = rand::thread_rng();
		let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key");
		let private_pem = private_key
			.to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
			.expect("encode private key")
			.as_str()
			.to_owned();
		let public_pem = private_key
			.to_public_key()
			.to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
			.expect("encode public key");
		TestKeypair {
			private_pem,
			public_pem,
		}
	})
}
