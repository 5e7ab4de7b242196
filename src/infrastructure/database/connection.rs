// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 内存数据库地址，仅用于测试
pub const MEMORY_URL: &str = "sqlite::memory:";

/// 服务数据库文件的连接地址，文件不存在时创建
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

/// 创建数据库连接池
///
/// # 参数
///
/// * `url` - 数据库连接地址
///
/// # 返回值
///
/// * `Ok(DatabaseConnection)` - 数据库连接
/// * `Err(DbErr)` - 连接过程中出现的错误
pub async fn create_pool(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());

    // SQLite is single writer; one connection also keeps in-memory databases alive
    opt.max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(opt).await
}

/// 打开服务数据库并应用迁移
pub async fn open_database(url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = create_pool(url).await?;
    Migrator::up(&db, None).await?;
    debug!("Opened database {}", url);
    Ok(db)
}
