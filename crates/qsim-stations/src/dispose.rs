use qsim_core::Unique;
use qsim_engine::Client;
use qsim_stats::DiscreteRecord;

use crate::station::Station;

/// The three discrete recorders a Dispose maintains over a client's full
/// trajectory (spec.md §4.B, §4.H).
#[derive(Default)]
pub struct DisposeRecorders {
    pub client_waiting: DiscreteRecord,
    pub client_service: DiscreteRecord,
    pub client_residence: DiscreteRecord,
}

/// Terminal sink. Every client that reaches a Dispose has its ledger
/// summed into the trajectory recorders and is then dropped.
pub struct Dispose {
    sim: qsim_engine::SimHandle,
    recorders: DisposeRecorders,
}

impl Dispose {
    pub fn new(sim: qsim_engine::SimHandle) -> Self {
        Self {
            sim,
            recorders: DisposeRecorders::default(),
        }
    }

    pub fn recorders(&self) -> &DisposeRecorders {
        &self.recorders
    }
}

impl Station for Dispose {
    fn receive(&mut self, mut client: Client) -> anyhow::Result<()> {
        let now = self.sim.borrow().now();
        let residence = now - client.created_at();
        client.ledger_mut().residence = Some(residence);
        log::debug!("client {:?} disposed after residence {residence}", client.id());
        let ledger = client.ledger();
        self.recorders.client_waiting.observe(ledger.waiting);
        self.recorders.client_service.observe(ledger.service);
        self.recorders.client_residence.observe(residence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsim_core::IdGen;

    #[test]
    fn records_trajectory_and_drops_client() {
        let sim = qsim_engine::Simulator::new_handle();
        let mut dispose = Dispose::new(sim.clone());
        let mut ids = IdGen::<qsim_engine::ClientMark>::new();
        let mut c = qsim_engine::Client::new(ids.next_id(), None, 0.0);
        c.ledger_mut().waiting = 5.0;
        c.ledger_mut().service = 10.0;
        dispose.receive(c).unwrap();
        assert_eq!(dispose.recorders().client_waiting.count(), 1);
        assert_eq!(dispose.recorders().client_waiting.mean(), 5.0);
        assert_eq!(dispose.recorders().client_service.mean(), 10.0);
    }
}
