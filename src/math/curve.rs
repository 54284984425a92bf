//! 一维曲线
//!
//! 输入在 [0, 1] 区间（调用方负责重映射），按关键帧分段插值。

/// 插值模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// 线性插值
    #[default]
    Linear,
    /// 阶梯插值 (无插值)
    Step,
}

/// 曲线关键帧
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveKey {
    /// 时间
    pub time: f32,
    /// 值
    pub value: f32,
}

/// 分段曲线
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    /// 关键帧列表（按时间排序）
    keys: Vec<CurveKey>,
    /// 插值模式
    pub interpolation: Interpolation,
}

impl Curve {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            keys: Vec::new(),
            interpolation,
        }
    }

    /// 常量曲线
    pub fn constant(value: f32) -> Self {
        let mut curve = Self::new(Interpolation::Linear);
        curve.add_key(0.0, value);
        curve
    }

    /// 从 `start` 线性变化到 `end`
    pub fn linear(start: f32, end: f32) -> Self {
        let mut curve = Self::new(Interpolation::Linear);
        curve.add_key(0.0, start);
        curve.add_key(1.0, end);
        curve
    }

    /// 添加关键帧
    pub fn add_key(&mut self, time: f32, value: f32) {
        let index = self
            .keys
            .binary_search_by(|k| k.time.total_cmp(&time))
            .unwrap_or_else(|i| i);
        self.keys.insert(index, CurveKey { time, value });
    }

    /// 链式添加关键帧
    pub fn with_key(mut self, time: f32, value: f32) -> Self {
        self.add_key(time, value);
        self
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// 评估曲线；空曲线返回 0
    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };

        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        for pair in self.keys.windows(2) {
            let (k0, k1) = (pair[0], pair[1]);
            if t >= k0.time && t < k1.time {
                return match self.interpolation {
                    Interpolation::Step => k0.value,
                    Interpolation::Linear => {
                        let span = k1.time - k0.time;
                        if span <= f32::EPSILON {
                            k1.value
                        } else {
                            let local_t = (t - k0.time) / span;
                            k0.value + (k1.value - k0.value) * local_t
                        }
                    }
                };
            }
        }

        last.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_curve() {
        let curve = Curve::linear(1.0, 0.0);
        assert!((curve.evaluate(0.0) - 1.0).abs() < 0.001);
        assert!((curve.evaluate(0.5) - 0.5).abs() < 0.001);
        assert!(curve.evaluate(1.0).abs() < 0.001);
    }

    #[test]
    fn test_clamps_outside_keys() {
        let curve = Curve::linear(2.0, 4.0);
        assert_eq!(curve.evaluate(-3.0), 2.0);
        assert_eq!(curve.evaluate(7.0), 4.0);
    }

    #[test]
    fn test_step_curve() {
        let curve = Curve::new(Interpolation::Step)
            .with_key(0.0, 0.0)
            .with_key(0.5, 1.0)
            .with_key(1.0, 1.0);
        assert_eq!(curve.evaluate(0.49), 0.0);
        assert_eq!(curve.evaluate(0.5), 1.0);
        assert_eq!(curve.evaluate(0.75), 1.0);
    }

    #[test]
    fn test_keys_sorted_on_insert() {
        let curve = Curve::default().with_key(1.0, 3.0).with_key(0.0, 1.0);
        assert_eq!(curve.keys()[0].time, 0.0);
        assert!((curve.evaluate(0.5) - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_curve() {
        assert_eq!(Curve::default().evaluate(0.3), 0.0);
    }
}
