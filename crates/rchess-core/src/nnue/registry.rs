//! モデルレジストリ
//!
//! Big / Small の2スロットに読み込み済みモデルを `Arc` で保持する。
//! 読み込みは新しく確保したモデルに対して行い、成功した場合のみスロットを差し替える。
//! 差し替えは `&mut self` を要するため、探索スレッドが動いている間は行えない。
//! 各スレッドの評価器は [`networks`](ModelRegistry::networks) で得た `Arc` の組を持つ。

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::constants::{
    EVAL_FILE_DEFAULT_NAME_BIG, EVAL_FILE_DEFAULT_NAME_SMALL, TRANSFORMED_FEATURE_DIMENSIONS_BIG,
    TRANSFORMED_FEATURE_DIMENSIONS_SMALL,
};
use super::error::{NnueError, Result};
use super::features::FeatureIndexTable;
use super::model::Model;
use super::stats::NetKind;
use crate::config::EvalConfig;

pub type BigModel = Model<TRANSFORMED_FEATURE_DIMENSIONS_BIG>;
pub type SmallModel = Model<TRANSFORMED_FEATURE_DIMENSIONS_SMALL>;

/// 評価器に渡す読み込み済みモデルの組
#[derive(Clone)]
pub struct Networks {
    pub big: Arc<BigModel>,
    pub small: Arc<SmallModel>,
}

/// 既定ネットワークとして埋め込むバイト列
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedNets {
    pub big: Option<&'static [u8]>,
    pub small: Option<&'static [u8]>,
}

impl EmbeddedNets {
    fn get(&self, size: NetKind) -> Option<&'static [u8]> {
        match size {
            NetKind::Big => self.big,
            NetKind::Small => self.small,
        }
    }
}

/// 1サイズ分のスロット
struct Slot<M> {
    model: Option<Arc<M>>,
    file_name: Option<String>,
    /// 直近の `init` で要求されたファイル名
    requested: Option<String>,
}

impl<M> Slot<M> {
    const fn empty() -> Self {
        Self { model: None, file_name: None, requested: None }
    }

    fn replace(&mut self, name: &str, model: M) {
        self.model = Some(Arc::new(model));
        self.file_name = Some(name.to_string());
    }

    /// 読み込み済みモデル（未読み込みなら要求された名前、なければ既定名で `NotLoaded`）
    fn loaded(&self, size: NetKind) -> Result<Arc<M>> {
        self.model.clone().ok_or_else(|| {
            let name = self.requested.as_deref().unwrap_or(default_file_name(size));
            NnueError::NotLoaded(name.to_string())
        })
    }
}

/// ネットワークの探索先
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchDir {
    /// 埋め込みデータ（既定名のときのみ）
    Internal,
    /// 作業ディレクトリ（ファイル名をそのまま開く）
    WorkingDirectory,
    Directory(PathBuf),
}

/// NetKind ごとの既定ファイル名
pub const fn default_file_name(size: NetKind) -> &'static str {
    match size {
        NetKind::Big => EVAL_FILE_DEFAULT_NAME_BIG,
        NetKind::Small => EVAL_FILE_DEFAULT_NAME_SMALL,
    }
}

/// モデルレジストリ
pub struct ModelRegistry {
    big: Slot<BigModel>,
    small: Slot<SmallModel>,
    embedded: EmbeddedNets,
}

impl ModelRegistry {
    /// 空のレジストリ（埋め込みネットワークなし）
    pub fn new() -> Self {
        Self::with_embedded(EmbeddedNets::default())
    }

    /// 埋め込みネットワーク付きのレジストリ
    pub fn with_embedded(embedded: EmbeddedNets) -> Self {
        Self { big: Slot::empty(), small: Slot::empty(), embedded }
    }

    /// 設定に従って両サイズのネットワークを読み込む
    ///
    /// 探索順は 埋め込み → 作業ディレクトリ → 実行ファイルのディレクトリ → 設定のディレクトリ。
    /// 既に同じ名前で読み込み済みなら何もしない。読み込めなかった場合は
    /// [`verify`](Self::verify) で検出する。
    pub fn init(&mut self, config: &EvalConfig) {
        FeatureIndexTable::global();
        let dirs = search_dirs(config);
        for size in [NetKind::Big, NetKind::Small] {
            let eval_file = requested_file_name(config, size).to_string();
            self.set_requested(size, &eval_file);
            for dir in &dirs {
                if self.current_file_name(size) == Some(eval_file.as_str()) {
                    break;
                }
                match dir {
                    SearchDir::Internal => {
                        if eval_file != default_file_name(size) {
                            continue;
                        }
                        if let Some(bytes) = self.embedded.get(size) {
                            debug!("Trying embedded network {eval_file}");
                            self.load_eval_bytes(&eval_file, bytes, size);
                        }
                    }
                    SearchDir::WorkingDirectory => {
                        self.try_load_path(&eval_file, Path::new(&eval_file), size);
                    }
                    SearchDir::Directory(dir) => {
                        self.try_load_path(&eval_file, &dir.join(&eval_file), size);
                    }
                }
            }
        }
    }

    fn set_requested(&mut self, size: NetKind, name: &str) {
        let requested = Some(name.to_string());
        match size {
            NetKind::Big => self.big.requested = requested,
            NetKind::Small => self.small.requested = requested,
        }
    }

    fn try_load_path(&mut self, name: &str, path: &Path, size: NetKind) {
        if !path.is_file() {
            debug!("Network file not found: {}", path.display());
            return;
        }
        self.load_eval_file(name, path, size);
    }

    /// ストリームから読み込み、成功した場合のみスロットを差し替える
    pub fn load_eval<R: Read>(&mut self, name: &str, reader: &mut R, size: NetKind) -> bool {
        let result = match size {
            NetKind::Big => BigModel::read(reader).map(|model| self.big.replace(name, model)),
            NetKind::Small => SmallModel::read(reader).map(|model| self.small.replace(name, model)),
        };
        match result {
            Ok(()) => {
                info!("Loaded {size:?} network {name}: {}", self.description(size).unwrap_or(""));
                true
            }
            Err(e) => {
                warn!("Failed to load {size:?} network {name}: {e}");
                false
            }
        }
    }

    /// メモリ上のバイト列から読み込み
    pub fn load_eval_bytes(&mut self, name: &str, bytes: &[u8], size: NetKind) -> bool {
        self.load_eval(name, &mut Cursor::new(bytes), size)
    }

    /// ファイルから読み込み（`name` はスロットに記録する名前）
    pub fn load_eval_file(&mut self, name: &str, path: &Path, size: NetKind) -> bool {
        match File::open(path) {
            Ok(file) => self.load_eval(name, &mut BufReader::new(file), size),
            Err(e) => {
                warn!("Failed to open {}: {e}", path.display());
                false
            }
        }
    }

    /// ストリームへ書き出す（未読み込みなら失敗）
    pub fn save_eval<W: Write>(&self, writer: &mut W, size: NetKind) -> bool {
        let result = match size {
            NetKind::Big => self.big.model.as_ref().map(|m| m.write(writer)),
            NetKind::Small => self.small.model.as_ref().map(|m| m.write(writer)),
        };
        match result {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                warn!("Failed to export a net: {e}");
                false
            }
            None => {
                warn!("Failed to export a net: {size:?} network is not loaded");
                false
            }
        }
    }

    /// ファイルへ書き出す
    ///
    /// `path` を省略できるのは既定名のネットワークを読み込んでいる場合のみで、
    /// 既定名で作業ディレクトリに保存する。
    pub fn save_eval_file(&self, path: Option<&Path>, size: NetKind) -> bool {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                if self.current_file_name(size) != Some(default_file_name(size)) {
                    warn!("{}", NnueError::NoFileName);
                    return false;
                }
                PathBuf::from(default_file_name(size))
            }
        };

        let saved = match File::create(&path) {
            Ok(file) => {
                let mut writer = BufWriter::new(file);
                self.save_eval(&mut writer, size)
            }
            Err(e) => {
                warn!("Failed to create {}: {e}", path.display());
                false
            }
        };
        if saved {
            info!("Network saved successfully to {}", path.display());
        } else {
            warn!("Failed to export a net");
        }
        saved
    }

    /// 要求されたネットワークが読み込まれているか確認
    ///
    /// 読み込まれていない場合はエラーログを出して `NotLoaded` を返す。
    /// 呼び出し側はプロセスを終了させること。
    pub fn verify(&self, config: &EvalConfig) -> Result<()> {
        for size in [NetKind::Big, NetKind::Small] {
            let eval_file = requested_file_name(config, size);
            if self.current_file_name(size) != Some(eval_file) {
                error!("Network evaluation parameters compatible with the engine must be available.");
                error!("The network file {eval_file} was not loaded successfully.");
                error!(
                    "The eval_file option might need to specify the full path, including the directory name, to the network file."
                );
                error!("The default net can be downloaded from: https://tests.stockfishchess.org/api/nn/{}", default_file_name(size));
                error!("The engine will be terminated now.");
                return Err(NnueError::NotLoaded(eval_file.to_string()));
            }
            info!("NNUE evaluation using {eval_file}");
        }
        Ok(())
    }

    /// 評価器に渡すモデルの組（両サイズとも読み込み済みであること）
    pub fn networks(&self) -> Result<Networks> {
        let big = self.big.loaded(NetKind::Big)?;
        let small = self.small.loaded(NetKind::Small)?;
        Ok(Networks { big, small })
    }

    /// 読み込み済みのファイル名
    pub fn current_file_name(&self, size: NetKind) -> Option<&str> {
        match size {
            NetKind::Big => self.big.file_name.as_deref(),
            NetKind::Small => self.small.file_name.as_deref(),
        }
    }

    /// 読み込み済みモデルの説明文字列
    pub fn description(&self, size: NetKind) -> Option<&str> {
        match size {
            NetKind::Big => self.big.model.as_deref().map(BigModel::description),
            NetKind::Small => self.small.model.as_deref().map(SmallModel::description),
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 読み込むべきファイル名（Small は常に既定名）
fn requested_file_name(config: &EvalConfig, size: NetKind) -> &str {
    match size {
        NetKind::Big => config.big_file_name(),
        NetKind::Small => EVAL_FILE_DEFAULT_NAME_SMALL,
    }
}

fn search_dirs(config: &EvalConfig) -> Vec<SearchDir> {
    let mut dirs = vec![SearchDir::Internal, SearchDir::WorkingDirectory];
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(SearchDir::Directory(exe_dir));
    }
    if let Some(dir) = &config.nnue_directory {
        dirs.push(SearchDir::Directory(dir.clone()));
    }
    dirs
}
