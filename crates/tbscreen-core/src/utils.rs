//! 通用数值工具函数

/// 四舍五入到指定小数位
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// 将数值限制在 [0,1] 区间，NaN 视为 0
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// 先限制到 [0,1] 再保留指定小数位，用于所有对外输出的概率和指数
pub fn surface(value: f64, decimals: i32) -> f64 {
    round_to(clamp_unit(value), decimals)
}
