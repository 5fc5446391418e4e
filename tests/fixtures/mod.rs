//! テスト用の共通モックとデータ

#![allow(dead_code)]

pub mod mock_services;
pub mod test_data;
