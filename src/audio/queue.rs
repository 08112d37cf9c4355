use rand::seq::SliceRandom;
use std::collections::VecDeque;
use tracing::{debug, info};

use super::{error::PlaybackError, track::Track};

/// FIFO queue of upcoming tracks.
///
/// The track that is currently playing is never stored here: it is popped
/// before it becomes current.
#[derive(Debug)]
pub struct PlaybackQueue {
    items: VecDeque<Track>,
    max_size: usize,
}

impl PlaybackQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Agrega un track al final y devuelve su posición (empezando en 1)
    pub fn push(&mut self, track: Track) -> Result<usize, PlaybackError> {
        if self.items.len() >= self.max_size {
            return Err(PlaybackError::QueueFull { max: self.max_size });
        }

        info!("➕ Agregado a la cola: {}", track.title());
        self.items.push_back(track);
        Ok(self.items.len())
    }

    /// Re-agrega un track por loop. Ignora el límite para no perder canciones del ciclo.
    pub fn requeue(&mut self, track: Track) {
        info!("🔁 Track agregado al final por loop: {}", track.title());
        self.items.push_back(track);
    }

    pub fn pop(&mut self) -> Option<Track> {
        let next = self.items.pop_front();
        if let Some(ref track) = next {
            debug!("➡️ Siguiente en cola (FIFO): {}", track.title());
        }
        next
    }

    /// Limpia la cola y devuelve cuántos tracks se eliminaron
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        if removed > 0 {
            info!("🗑️ Cola limpiada ({} canciones)", removed);
        }
        removed
    }

    pub fn shuffle(&mut self) {
        let mut rng = rand::thread_rng();
        self.items.make_contiguous().shuffle(&mut rng);
        info!("🔀 Cola mezclada");
    }

    pub fn titles(&self) -> Vec<String> {
        self.items.iter().map(|track| track.title().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
