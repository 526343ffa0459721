pub mod battle_engine;
pub mod battle_launcher;
pub mod config;
pub mod end_battle;
pub mod evidence;
pub mod farm_loop;
pub mod ocr;
pub mod perception;
pub mod persistence;
pub mod pointer;
pub mod screen_capture;
