//! RSA 密码加密模块
//!
//! 登录密码用服务器公布的 RSA 公钥加密 (PKCS#1 v1.5 填充)，
//! 密文经 base64 编码后随登录表单提交。公钥编译期内置，运行时不变。

use crate::error::{EmError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

/// 服务器公布的登录公钥 (PKIX PEM)
const LOGIN_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDHdsyxT66pDG4p73yope7jxA92
c0AT4qIJ/xtbBcHkFPK77upnsfDTJiVEuQDH+MiMeb+XhCLNKZGp0yaUU6GlxZdp
+nLW8b7Kmijr3iepaDhcbVTsYBWchaWUXauj9Lrhz58/6AE/NF0aMolxIGpsi+ST
2hSHPu3GSXMdhPCkWQIDAQAB
-----END PUBLIC KEY-----";

/// 加密登录密码
///
/// 解析或加密失败属于不可恢复错误 (内置密钥不应在运行期出问题)。
pub fn encrypt_password(plaintext: &str) -> Result<String> {
    let key = RsaPublicKey::from_public_key_pem(LOGIN_PUBLIC_KEY_PEM)
        .map_err(|e| EmError::Encryption(format!("Failed to parse public key: {}", e)))?;
    encrypt_with_key(&key, plaintext)
}

/// 使用指定公钥加密 (测试时可替换密钥对)
fn encrypt_with_key(key: &RsaPublicKey, plaintext: &str) -> Result<String> {
    let mut rng = rand::thread_rng();
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(|e| EmError::Encryption(format!("Encryption failed: {}", e)))?;
    Ok(BASE64.encode(ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    #[test]
    fn test_embedded_key_parses() {
        let result = encrypt_password("p1");
        assert!(result.is_ok());
        // 密文必须是合法 base64
        assert!(BASE64.decode(result.unwrap()).is_ok());
    }

    #[test]
    fn test_encrypt_roundtrip_with_test_keypair() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public_key = RsaPublicKey::from(&private_key);

        let encrypted = encrypt_with_key(&public_key, "p1").unwrap();
        let ciphertext = BASE64.decode(encrypted).unwrap();
        let decrypted = private_key.decrypt(Pkcs1v15Encrypt, &ciphertext).unwrap();
        assert_eq!(decrypted, b"p1");
    }

    #[test]
    fn test_padding_randomizes_ciphertext() {
        // PKCS#1 v1.5 填充带随机字节，相同明文两次加密结果不同
        let a = encrypt_password("p1").unwrap();
        let b = encrypt_password("p1").unwrap();
        assert_ne!(a, b);
    }
}
