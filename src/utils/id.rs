//! 标识符生成
//!
//! 多实例路由未指定实例 ID 时使用 [`generate_id`]（10 位 62 进制），
//! 事件 ID 使用 [`generate_uuid`]。

use rand::Rng;

/// 62 进制字符集
const BASE62_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 实例 ID 长度
pub const INSTANCE_ID_LENGTH: usize = 10;

/// 生成 10 位 62 进制 ID
///
/// 时间戳与随机数异或后逐位取余。系统时钟早于 UNIX 纪元时只使用随机部分。
///
/// ```
/// use navix_core::utils::id::generate_id;
///
/// let id = generate_id();
/// assert_eq!(id.len(), 10);
/// ```
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();

    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut value = millis ^ rng.gen::<u64>();

    let mut out = [0u8; INSTANCE_ID_LENGTH];
    for slot in out.iter_mut().rev() {
        *slot = BASE62_CHARS[(value % 62) as usize];
        value /= 62;
    }
    out.iter().map(|&b| b as char).collect()
}

/// 检查是否为 [`generate_id`] 生成格式的 ID
pub fn is_generated_id(id: &str) -> bool {
    id.len() == INSTANCE_ID_LENGTH && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// 生成 UUID v4 字符串
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        assert!(is_generated_id(&id), "unexpected id: {id}");
    }

    #[test]
    fn test_generate_id_uniqueness() {
        let ids: HashSet<_> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_is_generated_id() {
        assert!(is_generated_id("a1B2c3D4e5"));
        assert!(!is_generated_id("default"));
        assert!(!is_generated_id("a1B2c3-4e5"));
    }

    #[test]
    fn test_generate_uuid() {
        let uuid = generate_uuid();
        assert_eq!(uuid.len(), 36);
    }
}
