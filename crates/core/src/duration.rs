//! 倒计时时长解析
//!
//! 解析 "1d2h3m4s" 形式的紧凑时长：数字后跟单位 d/h/m/s，
//! 各段可任意组合但至少一段，总时长必须为正。

use chrono::Duration;

use crate::errors::{ReminderError, Result};

/// 解析倒计时时长字符串
pub fn parse_countdown(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ReminderError::InvalidCountdown("时长为空".to_string()));
    }

    let mut total_seconds: i64 = 0;
    let mut value: i64 = 0;
    let mut has_digit = false;
    let mut has_segment = false;

    for ch in s.chars() {
        if let Some(d) = ch.to_digit(10) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(d as i64))
                .ok_or_else(|| {
                    ReminderError::InvalidCountdown(format!("数值溢出: {input}"))
                })?;
            has_digit = true;
            continue;
        }

        if !has_digit {
            return Err(ReminderError::InvalidCountdown(format!(
                "单位 '{ch}' 前缺少数字: {input}"
            )));
        }

        let unit_seconds = match ch {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => {
                return Err(ReminderError::InvalidCountdown(format!(
                    "无效的时长单位 '{ch}': {input}"
                )))
            }
        };

        total_seconds = value
            .checked_mul(unit_seconds)
            .and_then(|v| total_seconds.checked_add(v))
            .ok_or_else(|| ReminderError::InvalidCountdown(format!("数值溢出: {input}")))?;
        value = 0;
        has_digit = false;
        has_segment = true;
    }

    // 末尾悬空数字视为缺少单位
    if has_digit {
        return Err(ReminderError::InvalidCountdown(format!(
            "末尾数字缺少单位: {input}"
        )));
    }
    if !has_segment || total_seconds <= 0 {
        return Err(ReminderError::InvalidCountdown(format!(
            "无效的倒计时时长: {input}"
        )));
    }

    Ok(Duration::seconds(total_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_form() {
        let d = parse_countdown("1d2h3m4s").unwrap();
        assert_eq!(d.num_seconds(), 86_400 + 2 * 3_600 + 3 * 60 + 4);
    }

    #[test]
    fn test_parse_single_segments() {
        assert_eq!(parse_countdown("30m").unwrap().num_minutes(), 30);
        assert_eq!(parse_countdown("2d").unwrap().num_days(), 2);
        assert_eq!(parse_countdown("45s").unwrap().num_seconds(), 45);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_countdown("").is_err());
        assert!(parse_countdown("   ").is_err());
        assert!(parse_countdown("abc").is_err());
        assert!(parse_countdown("1x").is_err());
        assert!(parse_countdown("d").is_err());
        assert!(parse_countdown("12").is_err());
        assert!(parse_countdown("0s").is_err());
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse_countdown("99999999999999999999d").is_err());
    }
}
