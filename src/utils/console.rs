use std::io::{self, BufRead};
use tokio::sync::mpsc;

/// 在獨立執行緒讀取輸入行，透過 channel 交給非同步端
///
/// 讀取執行緒不屬於 tokio runtime，所以阻塞中的讀取不會拖住 runtime 關閉；
/// 輸入結束 (EOF) 時 channel 關閉，`recv()` 回傳 `None`。
pub fn spawn_line_reader<R>(reader: R) -> mpsc::UnboundedReceiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in reader.lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// 標準輸入版本
pub fn stdin_lines() -> mpsc::UnboundedReceiver<io::Result<String>> {
    spawn_line_reader(io::BufReader::new(io::stdin()))
}
