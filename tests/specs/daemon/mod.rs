mod lifecycle;
mod processes;
mod storage;
mod yaml_sync;
