/// 规范化: 小写、去首尾空白、去除所有标点与空白
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// 按非字母数字字符切词 (小写)
pub fn tokens(raw: &str) -> Vec<String> {
    raw.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// 单号数字部分, 如 `INV-1001` -> `1001`
pub fn digit_core(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
