//! 农历标签解析
//!
//! 数据源按日给出农历标签（如 "正月初一"、"闰六月十五"、"腊月廿九"），
//! 这里将其解析为数值月日供农历规则匹配。闰月与正常月同名匹配。

/// 解析农历标签，失败返回None
pub fn parse_lunar_label(label: &str) -> Option<(u8, u8)> {
    let s = label.trim();
    let s = s.strip_prefix('闰').unwrap_or(s);
    let (month_part, day_part) = s.split_once('月')?;
    let month = parse_month(month_part)?;
    let day = parse_day(day_part)?;
    if !(1..=12).contains(&month) || !(1..=30).contains(&day) {
        return None;
    }
    Some((month, day))
}

fn parse_month(s: &str) -> Option<u8> {
    let month = match s {
        "正" | "一" => 1,
        "二" => 2,
        "三" => 3,
        "四" => 4,
        "五" => 5,
        "六" => 6,
        "七" => 7,
        "八" => 8,
        "九" => 9,
        "十" => 10,
        "十一" | "冬" => 11,
        "十二" | "腊" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_day(s: &str) -> Option<u8> {
    if let Some(rest) = s.strip_prefix('初') {
        return small_digit(rest);
    }
    match s {
        "十" => return Some(10),
        "二十" => return Some(20),
        "三十" => return Some(30),
        _ => {}
    }
    if let Some(rest) = s.strip_prefix('廿') {
        return small_digit(rest).filter(|d| *d < 10).map(|d| 20 + d);
    }
    if let Some(rest) = s.strip_prefix("二十") {
        return small_digit(rest).filter(|d| *d < 10).map(|d| 20 + d);
    }
    if let Some(rest) = s.strip_prefix('十') {
        return small_digit(rest).filter(|d| *d < 10).map(|d| 10 + d);
    }
    None
}

fn small_digit(s: &str) -> Option<u8> {
    let d = match s {
        "一" => 1,
        "二" => 2,
        "三" => 3,
        "四" => 4,
        "五" => 5,
        "六" => 6,
        "七" => 7,
        "八" => 8,
        "九" => 9,
        "十" => 10,
        _ => return None,
    };
    Some(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_labels() {
        assert_eq!(parse_lunar_label("正月初一"), Some((1, 1)));
        assert_eq!(parse_lunar_label("二月初十"), Some((2, 10)));
        assert_eq!(parse_lunar_label("五月十五"), Some((5, 15)));
        assert_eq!(parse_lunar_label("八月二十"), Some((8, 20)));
        assert_eq!(parse_lunar_label("腊月廿九"), Some((12, 29)));
        assert_eq!(parse_lunar_label("腊月二十九"), Some((12, 29)));
        assert_eq!(parse_lunar_label("冬月三十"), Some((11, 30)));
        assert_eq!(parse_lunar_label("十一月初八"), Some((11, 8)));
        assert_eq!(parse_lunar_label("十月初十"), Some((10, 10)));
    }

    #[test]
    fn test_parse_leap_month() {
        assert_eq!(parse_lunar_label("闰六月十五"), Some((6, 15)));
        assert_eq!(parse_lunar_label("闰二月初一"), Some((2, 1)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_lunar_label(""), None);
        assert_eq!(parse_lunar_label("正月"), None);
        assert_eq!(parse_lunar_label("初一"), None);
        assert_eq!(parse_lunar_label("十三月初一"), None);
        assert_eq!(parse_lunar_label("正月卅一"), None);
        assert_eq!(parse_lunar_label("2024-01-01"), None);
    }
}
