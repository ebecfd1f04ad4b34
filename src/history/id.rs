use chrono::Local;
use std::sync::atomic::{AtomicU32, Ordering};

/// 进程内递增序号，取值 0..1000，进程重启后归零
static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// 生成结果 ID
///
/// 格式为 `YYYYMMDD-HHMMSS-NNN`（本地时间），批量执行带 `BATCH` 前缀。
/// 同一秒内序号回绕是唯一的冲突来源，写入时由 create-exclusive 兜底。
pub fn generate_id(is_batch: bool) -> String {
    let base = format!(
        "{}-{:03}",
        Local::now().format("%Y%m%d-%H%M%S"),
        next_sequence()
    );

    if is_batch {
        format!("BATCH{}", base)
    } else {
        base
    }
}

fn next_sequence() -> u32 {
    let previous = SEQUENCE
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some((n + 1) % 1000))
        .unwrap_or_else(|n| n);
    (previous + 1) % 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_id_format() {
        let re = Regex::new(r"^\d{8}-\d{6}-\d{3}$").unwrap();
        assert!(re.is_match(&generate_id(false)));

        let batch = generate_id(true);
        assert!(batch.starts_with("BATCH"));
        assert!(re.is_match(&batch["BATCH".len()..]));
    }

    #[test]
    fn test_sequence_wraps() {
        for _ in 0..2000 {
            assert!(next_sequence() < 1000);
        }
    }
}
