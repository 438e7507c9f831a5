use super::types::Side;

/// 両対局者の残り時間（センチ秒）。
///
/// 手番側だけが自分の思考時間を消費する交互式の時計。残り時間は負になり得るが、
/// 時間切れを負けとして扱うことはしない。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockPair {
    remaining: [i64; 2],
    last_start: [i64; 2],
}

impl ClockPair {
    /// 両者に同じ持ち時間を与え、現在時刻を両者の開始時刻とする。
    pub fn start(initial_centis_each: i64, now_centis: i64) -> Self {
        Self {
            remaining: [initial_centis_each; 2],
            last_start: [now_centis; 2],
        }
    }

    /// `side` が指したときに呼ぶ。思考時間を差し引き、相手の時計を動かし始める。
    pub fn on_move(&mut self, side: Side, now_centis: i64) {
        let idx = side.index();
        let elapsed = now_centis.saturating_sub(self.last_start[idx]).max(0);
        self.remaining[idx] = self.remaining[idx].saturating_sub(elapsed);
        self.last_start[side.opponent().index()] = now_centis;
    }

    pub fn remaining_for(&self, side: Side) -> i64 {
        self.remaining[side.index()]
    }

    /// 次に指す `recipient` へ送る `time` / `otim` コマンド。
    pub fn time_update_for(&self, recipient: Side) -> [String; 2] {
        [
            format!("time {}", self.remaining_for(recipient)),
            format!("otim {}", self.remaining_for(recipient.opponent())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_side_is_charged_only_for_its_own_turn() {
        let mut clock = ClockPair::start(6_000, 100);
        // White が 250cs 考えて指す
        clock.on_move(Side::White, 350);
        assert_eq!(clock.remaining_for(Side::White), 5_750);
        assert_eq!(clock.remaining_for(Side::Black), 6_000);
        // Black の時計は White が指した時点から動く
        clock.on_move(Side::Black, 400);
        assert_eq!(clock.remaining_for(Side::Black), 5_950);
        assert_eq!(clock.remaining_for(Side::White), 5_750);
        clock.on_move(Side::White, 1_400);
        assert_eq!(clock.remaining_for(Side::White), 4_750);
    }

    #[test]
    fn remaining_is_non_increasing_for_non_decreasing_time() {
        let mut clock = ClockPair::start(500, 0);
        let mut prev = clock.remaining_for(Side::Black);
        for now in [0, 0, 30, 30, 90, 400, 1_000, 1_000] {
            clock.on_move(Side::Black, now);
            let cur = clock.remaining_for(Side::Black);
            assert!(cur <= prev, "{cur} > {prev} at {now}");
            prev = cur;
        }
        // 持ち時間を超えても負のまま記録される
        assert!(prev < 0);
    }

    #[test]
    fn time_update_lists_recipient_first() {
        let mut clock = ClockPair::start(1_000, 0);
        clock.on_move(Side::White, 120);
        assert_eq!(clock.time_update_for(Side::Black), ["time 1000".to_string(), "otim 880".to_string()]);
        assert_eq!(clock.time_update_for(Side::White), ["time 880".to_string(), "otim 1000".to_string()]);
    }
}
